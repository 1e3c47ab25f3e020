//! Read-only views of cart state handed to consumers.

use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::watch;

use crate::cart::{CartItem, CartState};
use crate::error::CartError;

/// An immutable snapshot of the cart at one revision.
///
/// Cloning is cheap. Every state change produces a snapshot with a new
/// identity, so consumers can detect change with [`Products::same_as`]
/// instead of comparing contents.
#[derive(Debug, Clone)]
pub struct Products {
    revision: u64,
    state: Arc<CartState>,
}

impl Products {
    pub(crate) fn empty() -> Self {
        Self {
            revision: 0,
            state: Arc::new(CartState::new()),
        }
    }

    /// Snapshot of `state` one revision after this one.
    pub(crate) fn next(&self, state: CartState) -> Self {
        Self {
            revision: self.revision + 1,
            state: Arc::new(state),
        }
    }

    /// Revision number. Starts at 0 and grows by one per state change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The cart state.
    pub fn state(&self) -> &CartState {
        &self.state
    }

    /// Items in cart order.
    pub fn items(&self) -> &[CartItem] {
        self.state.items()
    }

    /// Whether both snapshots are the same state instance.
    pub fn same_as(&self, other: &Products) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Deref for Products {
    type Target = CartState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

/// Change feed for a cart.
///
/// Consumers hold one of these to re-render when the cart changes.
/// Intermediate revisions may be skipped if several changes land between
/// two polls; the latest snapshot is always delivered.
#[derive(Debug, Clone)]
pub struct CartSubscription {
    rx: watch::Receiver<Products>,
}

impl CartSubscription {
    pub(crate) fn new(rx: watch::Receiver<Products>) -> Self {
        Self { rx }
    }

    /// The snapshot currently in the store.
    pub fn current(&self) -> Products {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the new snapshot.
    ///
    /// Fails with [`CartError::StoreClosed`] once every handle to the store
    /// has been dropped.
    pub async fn changed(&mut self) -> Result<Products, CartError> {
        self.rx.changed().await.map_err(|_| CartError::StoreClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
