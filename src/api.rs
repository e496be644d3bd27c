//! HTTP API: catalog, users, cart, orders, checkout.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use validator::Validate;

use crate::checkout::CheckoutService;
use crate::domain::{Cart, Order, Product, User};
use crate::notify::Notifier;
use crate::storage::{NewProduct, NewUser, Store};
use crate::CommerceError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub checkout: CheckoutService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        let checkout = CheckoutService::new(store.clone(), notifier);
        Self { store, checkout }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route(
            "/api/v1/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users/:id", get(get_user))
        .route(
            "/api/v1/cart/:user_id",
            get(get_cart).post(add_to_cart).delete(clear_cart),
        )
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/checkout", post(checkout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Requests & responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    fn limit_offset(&self) -> (i64, i64, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).min(100);
        (per_page as i64, ((page - 1) * per_page) as i64, page)
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
}

/// Transfer representation of a committed order.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub address: String,
    pub phone: String,
    pub status: String,
    pub total: Decimal,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            user_id: order.user_id,
            address: order.address.clone(),
            phone: order.phone.clone(),
            status: order.status.as_str().to_string(),
            total: order.total(),
            items: order
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    product_id: i.product_id,
                    name: i.name,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    total: i.total,
                })
                .collect(),
            created_at: order.created_at,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "ferrocart"}))
}

async fn list_products(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>, CommerceError> {
    let (limit, offset, page) = p.limit_offset();
    let (data, total) = s.store.list_products(limit, offset).await?;
    Ok(Json(PaginatedResponse { data, total, page }))
}

async fn create_product(
    State(s): State<AppState>,
    Json(r): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), CommerceError> {
    let product = s.store.create_product(r).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, CommerceError> {
    s.store
        .find_product(id)
        .await?
        .map(Json)
        .ok_or(CommerceError::ProductNotFound(id))
}

async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<NewProduct>,
) -> Result<Json<Product>, CommerceError> {
    Ok(Json(s.store.update_product(id, r).await?))
}

async fn delete_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, CommerceError> {
    s.store.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_user(
    State(s): State<AppState>,
    Json(r): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), CommerceError> {
    r.validate()
        .map_err(|e| CommerceError::Validation(e.to_string()))?;
    let user = s
        .store
        .create_user(NewUser { name: r.name, email: r.email })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, CommerceError> {
    s.store
        .find_user(id)
        .await?
        .map(Json)
        .ok_or(CommerceError::UserNotFound(id))
}

async fn get_cart(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Cart>, CommerceError> {
    Ok(Json(s.store.get_cart(user_id).await?))
}

async fn add_to_cart(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(r): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<Cart>), CommerceError> {
    let cart = s
        .store
        .add_cart_item(user_id, r.product_id, r.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

async fn clear_cart(
    State(s): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, CommerceError> {
    s.store.clear_cart(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_orders(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<OrderResponse>>, CommerceError> {
    let (limit, offset, page) = p.limit_offset();
    let (orders, total) = s.store.list_orders(limit, offset).await?;
    Ok(Json(PaginatedResponse {
        data: orders.into_iter().map(OrderResponse::from).collect(),
        total,
        page,
    }))
}

async fn get_order(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, CommerceError> {
    s.store
        .find_order(id)
        .await?
        .map(|o| Json(OrderResponse::from(o)))
        .ok_or(CommerceError::OrderNotFound(id))
}

async fn checkout(
    State(s): State<AppState>,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), CommerceError> {
    r.validate()
        .map_err(|e| CommerceError::Validation(e.to_string()))?;
    let order = s
        .checkout
        .create_order(r.user_id, &r.address, &r.phone_number)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

// =============================================================================
// Error mapping
// =============================================================================

impl IntoResponse for CommerceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::UserNotFound(_) | Self::ProductNotFound(_) | Self::OrderNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::EmptyCart | Self::InvalidQuantity | Self::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::OutOfStock { .. } => StatusCode::CONFLICT,
            // Unset stock is a catalog data problem, not a client mistake.
            Self::UndefinedStock { .. } | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transaction(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}
