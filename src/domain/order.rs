//! Order entity, an immutable snapshot of a checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Product;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub address: String,
    pub phone: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A single order line. `unit_price` is the product price captured at order
/// time; later catalog price changes must not alter it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    #[default]
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl Order {
    pub fn new(user_id: Uuid, address: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_number: format!("ORD-{:08}", rand::random::<u32>()),
            user_id,
            address: address.into(),
            phone: phone.into(),
            status: OrderStatus::Preparing,
            created_at: Utc::now(),
            items: vec![],
        }
    }

    pub fn total(&self) -> Decimal {
        self.items.iter().map(|i| i.total).sum()
    }
}

impl OrderItem {
    /// Captures a cart line against the product's current price.
    pub fn snapshot(product: &Product, quantity: i32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            quantity,
            unit_price: product.price,
            total: product.price * Decimal::from(quantity),
        }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "PREPARING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PREPARING" => Some(Self::Preparing),
            "SHIPPED" => Some(Self::Shipped),
            "DELIVERED" => Some(Self::Delivered),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}
