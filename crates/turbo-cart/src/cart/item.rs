//! Cart line item types.

use serde::{Deserialize, Serialize};

use crate::ids::ProductId;

/// A product line in the cart.
///
/// Serialized with the field names `id`, `title`, `image_url`, `price` and
/// `quantity`; this is the on-disk format of a persisted cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier, unique within the cart.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Product image location.
    pub image_url: String,
    /// Unit price as shown to the shopper.
    pub price: f64,
    /// Number of units. Always at least 1 while the item is in a cart.
    pub quantity: u32,
}

impl CartItem {
    /// Copy of this item with a different quantity.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

/// Input for adding a product to the cart.
///
/// `quantity` is optional; a missing or zero quantity is stored as 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    /// Product identifier.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Product image location.
    pub image_url: String,
    /// Unit price.
    pub price: f64,
    /// Requested quantity.
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl NewCartItem {
    /// Create an add request without an explicit quantity.
    pub fn new(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            price,
            quantity: None,
        }
    }

    /// Set the requested quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// The quantity the item enters the cart with.
    pub fn normalized_quantity(&self) -> u32 {
        match self.quantity {
            None | Some(0) => 1,
            Some(quantity) => quantity,
        }
    }

    pub(crate) fn into_item(self) -> CartItem {
        let quantity = self.normalized_quantity();
        CartItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity,
        }
    }
}
