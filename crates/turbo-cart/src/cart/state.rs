//! Immutable cart state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cart::{CartItem, NewCartItem};
use crate::error::CartError;
use crate::ids::ProductId;

/// The ordered list of items in a cart.
///
/// A `CartState` is a value: operations return a new state and leave `self`
/// untouched, so snapshots handed to readers never change underneath them.
///
/// Invariants, checked on construction and on deserialization:
/// - no two items share an id
/// - every item has `quantity >= 1`
/// - every price is finite (JSON has no NaN or infinity)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct CartState {
    items: Vec<CartItem>,
}

impl CartState {
    /// Create an empty cart state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a list of items, validating cart invariants.
    pub fn from_items(items: Vec<CartItem>) -> Result<Self, CartError> {
        validate(&items)?;
        Ok(Self { items })
    }

    /// Items in cart order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Iterate over items in cart order.
    pub fn iter(&self) -> std::slice::Iter<'_, CartItem> {
        self.items.iter()
    }

    /// Get an item by product ID.
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Check if a product is in the cart.
    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all items (sum of quantities).
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// State with `item` added.
    ///
    /// If the product is already in the cart this is [`incremented`]: the
    /// existing entry keeps its title, image and price and gains one unit,
    /// whatever quantity the request carried.
    ///
    /// A NaN or infinite price is rejected even for a product already in
    /// the cart.
    ///
    /// [`incremented`]: CartState::incremented
    pub fn added(&self, item: NewCartItem) -> Result<Self, CartError> {
        if !item.price.is_finite() {
            return Err(CartError::InvalidPrice(item.id));
        }
        if self.contains(&item.id) {
            return self.incremented(&item.id);
        }

        let mut items = self.items.clone();
        items.push(item.into_item());
        Ok(Self { items })
    }

    /// State with one more unit of `id`.
    pub fn incremented(&self, id: &ProductId) -> Result<Self, CartError> {
        let idx = self.position(id)?;
        let current = &self.items[idx];
        let quantity = current
            .quantity
            .checked_add(1)
            .ok_or_else(|| CartError::QuantityOverflow(id.clone()))?;

        let mut items = self.items.clone();
        items[idx] = current.with_quantity(quantity);
        Ok(Self { items })
    }

    /// State with one less unit of `id`. The last unit removes the item.
    pub fn decremented(&self, id: &ProductId) -> Result<Self, CartError> {
        let idx = self.position(id)?;
        let current = &self.items[idx];

        let mut items = self.items.clone();
        if current.quantity > 1 {
            items[idx] = current.with_quantity(current.quantity - 1);
        } else {
            items.remove(idx);
        }
        Ok(Self { items })
    }

    /// Consume and return the item list.
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    fn position(&self, id: &ProductId) -> Result<usize, CartError> {
        self.items
            .iter()
            .position(|i| &i.id == id)
            .ok_or_else(|| CartError::ItemNotInCart(id.clone()))
    }
}

fn validate(items: &[CartItem]) -> Result<(), CartError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            return Err(CartError::InvalidState(format!(
                "item {} has quantity 0",
                item.id
            )));
        }
        if !item.price.is_finite() {
            return Err(CartError::InvalidPrice(item.id.clone()));
        }
        if !seen.insert(&item.id) {
            return Err(CartError::InvalidState(format!(
                "duplicate item id {}",
                item.id
            )));
        }
    }
    Ok(())
}

impl TryFrom<Vec<CartItem>> for CartState {
    type Error = CartError;

    fn try_from(items: Vec<CartItem>) -> Result<Self, Self::Error> {
        Self::from_items(items)
    }
}

impl From<CartState> for Vec<CartItem> {
    fn from(state: CartState) -> Self {
        state.items
    }
}

impl<'a> IntoIterator for &'a CartState {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> NewCartItem {
        NewCartItem::new("shirt", "Shirt", "https://img/shirt.png", 25.0)
    }

    fn mug() -> NewCartItem {
        NewCartItem::new("mug", "Mug", "https://img/mug.png", 8.5)
    }

    #[test]
    fn test_add_without_quantity() {
        let state = CartState::new().added(shirt()).unwrap();

        assert_eq!(state.len(), 1);
        assert_eq!(state.items()[0].quantity, 1);
    }

    #[test]
    fn test_add_zero_quantity_normalizes() {
        let state = CartState::new().added(shirt().with_quantity(0)).unwrap();
        assert_eq!(state.get(&"shirt".into()).unwrap().quantity, 1);
    }

    #[test]
    fn test_add_existing_increments_by_one() {
        let state = CartState::new()
            .added(shirt())
            .unwrap()
            .added(mug())
            .unwrap();

        let repriced = NewCartItem::new("shirt", "Other title", "other.png", 99.0).with_quantity(5);
        let next = state.added(repriced).unwrap();

        assert_eq!(next.len(), 2);
        let item = next.get(&"shirt".into()).unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(item.title, "Shirt");
        assert_eq!(item.price, 25.0);
    }

    #[test]
    fn test_increment_preserves_fields() {
        let state = CartState::new().added(shirt()).unwrap();
        let next = state.incremented(&"shirt".into()).unwrap();

        let before = state.get(&"shirt".into()).unwrap();
        let after = next.get(&"shirt".into()).unwrap();
        assert_eq!(after.quantity, before.quantity + 1);
        assert_eq!(after.title, before.title);
        assert_eq!(after.image_url, before.image_url);
        assert_eq!(after.price, before.price);
    }

    #[test]
    fn test_operations_leave_original_untouched() {
        let state = CartState::new().added(shirt()).unwrap();
        let _ = state.incremented(&"shirt".into()).unwrap();
        let _ = state.decremented(&"shirt".into()).unwrap();

        assert_eq!(state.get(&"shirt".into()).unwrap().quantity, 1);
    }

    #[test]
    fn test_decrement_above_one_keeps_item() {
        let state = CartState::new().added(shirt().with_quantity(3)).unwrap();
        let next = state.decremented(&"shirt".into()).unwrap();

        assert_eq!(next.get(&"shirt".into()).unwrap().quantity, 2);
    }

    #[test]
    fn test_decrement_last_unit_removes_item() {
        let state = CartState::new()
            .added(shirt())
            .unwrap()
            .added(mug())
            .unwrap();
        let next = state.decremented(&"shirt".into()).unwrap();

        assert!(next.get(&"shirt".into()).is_none());
        assert!(!next.contains(&"shirt".into()));
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_increment_keeps_position() {
        let state = CartState::new()
            .added(shirt())
            .unwrap()
            .added(mug())
            .unwrap();
        let next = state.incremented(&"shirt".into()).unwrap();

        let ids: Vec<&str> = next.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["shirt", "mug"]);
    }

    #[test]
    fn test_unknown_id_is_error() {
        let state = CartState::new().added(shirt()).unwrap();

        assert_eq!(
            state.incremented(&"ghost".into()),
            Err(CartError::ItemNotInCart("ghost".into()))
        );
        assert_eq!(
            state.decremented(&"ghost".into()),
            Err(CartError::ItemNotInCart("ghost".into()))
        );
    }

    #[test]
    fn test_increment_overflow() {
        let state = CartState::new()
            .added(shirt().with_quantity(u32::MAX))
            .unwrap();

        assert_eq!(
            state.incremented(&"shirt".into()),
            Err(CartError::QuantityOverflow("shirt".into()))
        );
    }

    #[test]
    fn test_item_count() {
        let state = CartState::new()
            .added(shirt().with_quantity(2))
            .unwrap()
            .added(mug().with_quantity(3))
            .unwrap();

        assert_eq!(state.item_count(), 5);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_from_items_rejects_duplicates() {
        let item = shirt().into_item();
        let result = CartState::from_items(vec![item.clone(), item]);
        assert!(matches!(result, Err(CartError::InvalidState(_))));
    }

    #[test]
    fn test_from_items_rejects_zero_quantity() {
        let item = shirt().into_item().with_quantity(0);
        let result = CartState::from_items(vec![item]);
        assert!(matches!(result, Err(CartError::InvalidState(_))));
    }

    #[test]
    fn test_add_rejects_non_finite_price() {
        let state = CartState::new().added(mug()).unwrap();

        for price in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let bad = NewCartItem::new("bad", "Bad", "u", price);
            assert_eq!(
                state.added(bad),
                Err(CartError::InvalidPrice("bad".into()))
            );

            let again = NewCartItem::new("mug", "Mug", "u", price);
            assert_eq!(
                state.added(again),
                Err(CartError::InvalidPrice("mug".into()))
            );
        }
        assert_eq!(state.get(&"mug".into()).unwrap().quantity, 1);
    }

    #[test]
    fn test_from_items_rejects_non_finite_price() {
        let mut item = shirt().into_item();
        item.price = f64::INFINITY;
        let result = CartState::from_items(vec![mug().into_item(), item]);
        assert_eq!(result, Err(CartError::InvalidPrice("shirt".into())));
    }

    #[test]
    fn test_serializes_as_item_array() {
        let state = CartState::new().added(shirt()).unwrap();
        let json = serde_json::to_string(&state).unwrap();

        assert!(json.starts_with('['));
        let back: CartState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"[
            {"id":"a","title":"T","image_url":"u","price":1.0,"quantity":1},
            {"id":"a","title":"T","image_url":"u","price":1.0,"quantity":2}
        ]"#;
        assert!(serde_json::from_str::<CartState>(json).is_err());
    }
}
