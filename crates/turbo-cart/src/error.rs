//! Cart error types.

use thiserror::Error;

use crate::ids::ProductId;

/// Errors that can occur in cart operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CartError {
    /// The cart was used outside of a `CartProvider` scope.
    #[error("use_cart must be used within a CartProvider")]
    NotProvisioned,

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(ProductId),

    /// Incrementing would overflow the quantity counter.
    #[error("Quantity overflow for {0}")]
    QuantityOverflow(ProductId),

    /// The price is NaN or infinite.
    #[error("Invalid price for {0}")]
    InvalidPrice(ProductId),

    /// A cart item list violates cart invariants.
    #[error("Invalid cart state: {0}")]
    InvalidState(String),

    /// The persistence provider failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store's background tasks are gone.
    #[error("Cart store is closed")]
    StoreClosed,
}

impl From<turbo_kv::KvError> for CartError {
    fn from(e: turbo_kv::KvError) -> Self {
        match e {
            turbo_kv::KvError::SerializeError(e) => CartError::Serialization(e.to_string()),
            other => CartError::Persistence(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CartError {
    fn from(e: serde_json::Error) -> Self {
        CartError::Serialization(e.to_string())
    }
}
