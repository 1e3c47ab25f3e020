//! Persistent shopping cart store for TurboCart.
//!
//! This crate keeps a shopper's cart in memory and mirrors it to a
//! [`turbo_kv::KvStore`]:
//!
//! - **Cart**: [`CartItem`], [`NewCartItem`] and the immutable [`CartState`]
//! - **Store**: [`CartStore`] loads the persisted cart, applies
//!   add / increment / decrement, and writes every change back
//! - **Consumers**: [`CartHandle`] for explicit wiring, [`CartProvider`] and
//!   [`use_cart`] for scoped access, [`CartSubscription`] for change feeds
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_cart::prelude::*;
//! use turbo_kv::FileStore;
//!
//! let store = CartStore::open(FileStore::open(".cart").await?, &CartConfig::default());
//! store.ready().await?;
//!
//! let cart = store.handle();
//! cart.add_to_cart(NewCartItem::new("sku-1", "Mug", "https://img/mug.png", 8.5))?;
//!
//! for item in cart.products().iter() {
//!     println!("{} x{}", item.title, item.quantity);
//! }
//! ```

pub mod cart;
pub mod config;
pub mod error;
pub mod ids;
pub mod provider;

mod snapshot;
mod store;
mod writer;

pub use cart::{CartItem, CartState, NewCartItem};
pub use config::CartConfig;
pub use error::CartError;
pub use ids::ProductId;
pub use provider::{use_cart, CartProvider};
pub use snapshot::{CartSubscription, Products};
pub use store::{CartHandle, CartStore, LoadOutcome};
pub use writer::PendingWrite;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cart::{CartItem, CartState, NewCartItem};
    pub use crate::config::CartConfig;
    pub use crate::error::CartError;
    pub use crate::ids::ProductId;
    pub use crate::provider::{use_cart, CartProvider};
    pub use crate::snapshot::{CartSubscription, Products};
    pub use crate::store::{CartHandle, CartStore, LoadOutcome};
    pub use crate::writer::PendingWrite;
}
