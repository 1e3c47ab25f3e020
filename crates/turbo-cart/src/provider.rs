//! Scoped, ambient access to a cart.
//!
//! Passing a [`CartHandle`] to each consumer is the preferred wiring. For
//! consumers deep in a call tree, a [`CartProvider`] installs the handle for
//! the duration of a future or closure and [`use_cart`] retrieves it. Calling
//! [`use_cart`] outside such a scope is a wiring mistake and fails with
//! [`CartError::NotProvisioned`].

use std::future::Future;

use crate::error::CartError;
use crate::store::CartHandle;

tokio::task_local! {
    static CART: CartHandle;
}

/// Makes a cart available to everything running inside its scope.
#[derive(Debug, Clone)]
pub struct CartProvider {
    handle: CartHandle,
}

impl CartProvider {
    /// Create a provider for `handle`.
    pub fn new(handle: CartHandle) -> Self {
        Self { handle }
    }

    /// Run `fut` with the cart provisioned.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        CART.scope(self.handle.clone(), fut).await
    }

    /// Run `f` with the cart provisioned.
    pub fn sync_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        CART.sync_scope(self.handle.clone(), f)
    }
}

/// The cart provisioned for the current scope.
pub fn use_cart() -> Result<CartHandle, CartError> {
    CART.try_with(CartHandle::clone)
        .map_err(|_| CartError::NotProvisioned)
}
