//! Persistence gateway.
//!
//! The service talks to storage through the trait boundaries below, so the
//! checkout workflow and the HTTP layer are identical whether they run
//! against Postgres or the in-memory store used by tests and the
//! no-database fallback.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{Cart, Order, Product, User};
use crate::Result;

/// One stock subtraction to perform inside the order commit.
#[derive(Clone, Debug)]
pub struct StockDecrement {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: Option<String>,
    pub stock: Option<i32>,
}

impl NewProduct {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.price.is_sign_negative() {
            return Err(crate::CommerceError::Validation("price must be non-negative".into()));
        }
        if self.stock.is_some_and(|s| s < 0) {
            return Err(crate::CommerceError::Validation("stock must be non-negative".into()));
        }
        Ok(())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn create_product(&self, product: NewProduct) -> Result<Product>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;
    /// Newest first. Returns the page and the total count.
    async fn list_products(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)>;
    async fn update_product(&self, id: Uuid, product: NewProduct) -> Result<Product>;
    async fn delete_product(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// A user who never touched their cart gets an empty one.
    async fn get_cart(&self, user_id: Uuid) -> Result<Cart>;
    async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<Cart>;
    /// Idempotent: clearing an empty (or never-created) cart is a no-op.
    async fn clear_cart(&self, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists the order, its items, and every stock decrement as one
    /// atomic unit. A decrement that no longer holds (concurrent checkout)
    /// aborts the whole write with nothing persisted.
    async fn save_order(&self, order: &Order, decrements: &[StockDecrement]) -> Result<Order>;
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;
    /// Newest first. Returns the page and the total count.
    async fn list_orders(&self, limit: i64, offset: i64) -> Result<(Vec<Order>, i64)>;
}

/// The full gateway the service is wired with.
pub trait Store: UserStore + Catalog + CartStore + OrderStore {}

impl<T: UserStore + Catalog + CartStore + OrderStore> Store for T {}
