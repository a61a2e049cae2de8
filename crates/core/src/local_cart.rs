//! Session-scoped mirror of committed lines.
//!
//! Written by one task at a time (the commit path and explicit user edits);
//! read by any number of observers through [`LocalCart::subscribe`].

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::types::LocalCartItem;

#[derive(Debug, Clone)]
pub struct LocalCart {
    items: Arc<watch::Sender<Vec<LocalCartItem>>>,
}

impl Default for LocalCart {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCart {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self { items: Arc::new(tx) }
    }

    /// Add a line, summing quantities when the product is already present.
    pub fn add_item(&self, item: LocalCartItem) {
        self.items.send_modify(|items| {
            match items.iter_mut().find(|i| i.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity)
                }
                None => items.push(item),
            }
        });
    }

    /// Set a line's quantity; zero or less removes it.
    pub fn update_quantity(&self, product_id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        self.items.send_if_modified(|items| {
            match items.iter_mut().find(|i| i.product_id == product_id) {
                Some(existing) => {
                    existing.quantity = quantity;
                    true
                }
                None => false,
            }
        });
    }

    pub fn remove_item(&self, product_id: &str) {
        self.items.send_if_modified(|items| {
            let before = items.len();
            items.retain(|i| i.product_id != product_id);
            items.len() != before
        });
    }

    pub fn clear(&self) {
        self.items.send_if_modified(|items| {
            let had_items = !items.is_empty();
            items.clear();
            had_items
        });
    }

    pub fn items(&self) -> Vec<LocalCartItem> {
        self.items.borrow().clone()
    }

    pub fn get(&self, product_id: &str) -> Option<LocalCartItem> {
        self.items
            .borrow()
            .iter()
            .find(|i| i.product_id == product_id)
            .cloned()
    }

    pub fn total(&self) -> Decimal {
        self.items
            .borrow()
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<LocalCartItem>> {
        self.items.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, cents: i64, quantity: u32) -> LocalCartItem {
        LocalCartItem {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            price: Decimal::new(cents, 2),
            quantity,
            image_url: None,
        }
    }

    #[test]
    fn add_merges_by_product() {
        let cart = LocalCart::new();
        cart.add_item(item("a", 100, 1));
        cart.add_item(item("a", 100, 2));
        cart.add_item(item("b", 250, 1));
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.get("a").unwrap().quantity, 3);
        assert_eq!(cart.total(), Decimal::new(550, 2));
    }

    #[test]
    fn add_caps_quantity_at_max() {
        let cart = LocalCart::new();
        cart.add_item(item("a", 100, 1));
        cart.add_item(item("a", 100, u32::MAX));
        assert_eq!(cart.get("a").unwrap().quantity, u32::MAX);
    }

    #[test]
    fn update_to_zero_removes() {
        let cart = LocalCart::new();
        cart.add_item(item("a", 100, 1));
        cart.update_quantity("a", 5);
        assert_eq!(cart.get("a").unwrap().quantity, 5);
        cart.update_quantity("a", 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let cart = LocalCart::new();
        cart.add_item(item("a", 100, 1));
        cart.add_item(item("b", 100, 1));
        cart.remove_item("a");
        assert_eq!(cart.items().len(), 1);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn clones_share_state() {
        let cart = LocalCart::new();
        let other = cart.clone();
        other.add_item(item("a", 100, 1));
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let cart = LocalCart::new();
        let mut rx = cart.subscribe();
        cart.add_item(item("a", 100, 1));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
