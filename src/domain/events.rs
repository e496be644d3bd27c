//! Integration events published after checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Order;

/// Payload published to the message bus once an order has committed.
/// Consumed by downstream notification services (mailers, webhooks).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub total: Decimal,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderConfirmation {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            user_id: order.user_id,
            status: order.status.as_str().to_string(),
            total: order.total(),
            item_count: order.items.len(),
            created_at: order.created_at,
        }
    }
}
