//! Ferrocart E-commerce Order Service
//!
//! Self-hosted backend for catalog, cart, and order operations.
//!
//! ## Features
//! - Product catalog management
//! - Per-user shopping carts
//! - Atomic checkout with stock enforcement
//! - Order confirmation events over NATS
//! - Pluggable storage (Postgres or in-memory)

use thiserror::Error;
use uuid::Uuid;

pub mod api;
pub mod checkout;
pub mod domain;
pub mod notify;
pub mod storage;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    #[error("product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("cannot create an order from an empty cart")]
    EmptyCart,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("stock level is not set for product {name} ({product_id})")]
    UndefinedStock { product_id: Uuid, name: String },

    #[error("not enough stock for product {name}: requested {requested}, available {available}")]
    OutOfStock {
        product_id: Uuid,
        name: String,
        requested: i32,
        available: i32,
    },

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, CommerceError>;
