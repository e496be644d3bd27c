//! Product entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    /// `None` means the product has never been stocked, which is a distinct
    /// condition from a stock of zero.
    pub stock: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_in_stock(&self) -> bool {
        self.stock.is_some_and(|s| s > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: Option<i32>) -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: "SKU-00000001".into(),
            name: "Widget".into(),
            description: None,
            price: Decimal::new(1000, 2),
            currency: "USD".into(),
            stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_in_stock() {
        assert!(product(Some(3)).is_in_stock());
        assert!(!product(Some(0)).is_in_stock());
        assert!(!product(None).is_in_stock());
    }
}
