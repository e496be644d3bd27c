//! Shopping cart, one per user, created lazily.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl Cart {
    pub fn empty(user_id: Uuid) -> Self {
        Self { user_id, items: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Adds an item, merging quantities when the product is already carted.
    pub fn add_item(&mut self, product_id: Uuid, quantity: i32) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity += quantity;
        } else {
            self.items.push(CartItem { product_id, quantity });
        }
    }
}
