//! Shopping cart module.
//!
//! Contains the cart line item types and the immutable cart state.

mod item;
mod state;

pub use item::{CartItem, NewCartItem};
pub use state::CartState;
