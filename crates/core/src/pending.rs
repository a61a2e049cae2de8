//! The reviewable set of resolved lines awaiting confirmation.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::PendingCartItem;

/// Resolved lines plus the names that could not be matched.
///
/// Never empty: [`PendingSet::new`] refuses an empty item list, and an edit
/// that removes the last line drops the whole set (see [`PendingEdit`]).
/// Product ids are unique within a set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingSet {
    items: Vec<PendingCartItem>,
    unavailable: Vec<String>,
}

impl PendingSet {
    /// Build a set, merging lines that resolved to the same product by
    /// summing their quantities. `None` when `items` is empty.
    pub fn new(items: Vec<PendingCartItem>, unavailable: Vec<String>) -> Option<Self> {
        let mut merged: Vec<PendingCartItem> = Vec::with_capacity(items.len());
        for item in items {
            match merged.iter_mut().find(|m| m.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity)
                }
                None => merged.push(item),
            }
        }
        if merged.is_empty() {
            return None;
        }
        Some(Self {
            items: merged,
            unavailable,
        })
    }

    pub fn items(&self) -> &[PendingCartItem] {
        &self.items
    }

    /// Names that found no product. Informational only.
    pub fn unavailable(&self) -> &[String] {
        &self.unavailable
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, product_id: &str) -> Option<&PendingCartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Set a line's quantity; zero or less removes it. Returns `false` when
    /// the product is not in the set.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(PendingCartItem::line_total).sum()
    }

    pub fn into_items(self) -> Vec<PendingCartItem> {
        self.items
    }
}

/// A user edit to the pending set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingEdit {
    SetQuantity { product_id: String, quantity: i64 },
    Remove { product_id: String },
}

impl PendingEdit {
    /// Apply to the session's pending slot. Clears the slot when the last
    /// line goes. Returns whether anything changed.
    pub fn apply(&self, slot: &mut Option<PendingSet>) -> bool {
        let Some(set) = slot.as_mut() else {
            return false;
        };
        let changed = match self {
            PendingEdit::SetQuantity {
                product_id,
                quantity,
            } => set.update_quantity(product_id, *quantity),
            PendingEdit::Remove { product_id } => set.remove(product_id),
        };
        if set.is_empty() {
            *slot = None;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, cents: i64, quantity: u32) -> PendingCartItem {
        PendingCartItem {
            product_id: id.to_string(),
            display_name: format!("Product {}", id),
            unit_price: Decimal::new(cents, 2),
            quantity,
            image_url: None,
        }
    }

    fn set() -> PendingSet {
        PendingSet::new(
            vec![line("a", 199, 1), line("b", 350, 2)],
            vec!["saffron".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn empty_set_is_refused() {
        assert!(PendingSet::new(vec![], vec!["saffron".to_string()]).is_none());
    }

    #[test]
    fn duplicate_products_are_merged() {
        let set = PendingSet::new(vec![line("a", 199, 1), line("a", 199, 2)], vec![]).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.items()[0].quantity, 3);
    }

    #[test]
    fn merged_quantity_caps_at_max() {
        let set = PendingSet::new(vec![line("a", 199, u32::MAX), line("a", 199, 1)], vec![])
            .unwrap();
        assert_eq!(set.items()[0].quantity, u32::MAX);
    }

    #[test]
    fn subtotal_sums_line_totals() {
        assert_eq!(set().subtotal(), Decimal::new(899, 2));
    }

    #[test]
    fn update_quantity_sets_exact_value() {
        let mut s = set();
        assert!(s.update_quantity("a", 4));
        assert_eq!(s.get("a").unwrap().quantity, 4);
        assert!(!s.update_quantity("zzz", 4));
    }

    #[test]
    fn non_positive_quantity_removes() {
        let mut s = set();
        assert!(s.update_quantity("a", 0));
        assert!(s.get("a").is_none());
        assert!(s.update_quantity("b", -3));
        assert!(s.is_empty());
    }

    #[test]
    fn removing_last_line_clears_slot() {
        let mut slot = Some(PendingSet::new(vec![line("a", 100, 1)], vec![]).unwrap());
        let edit = PendingEdit::Remove {
            product_id: "a".to_string(),
        };
        assert!(edit.apply(&mut slot));
        assert!(slot.is_none());
    }

    #[test]
    fn edit_on_empty_slot_is_noop() {
        let mut slot = None;
        let edit = PendingEdit::SetQuantity {
            product_id: "a".to_string(),
            quantity: 2,
        };
        assert!(!edit.apply(&mut slot));
    }

    #[test]
    fn unknown_edit_keeps_set() {
        let mut slot = Some(set());
        let edit = PendingEdit::Remove {
            product_id: "zzz".to_string(),
        };
        assert!(!edit.apply(&mut slot));
        assert_eq!(slot.unwrap().len(), 2);
    }
}
