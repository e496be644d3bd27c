//! Postgres store.
//!
//! The order commit runs in one transaction: a conditional decrement per
//! item (`stock >= quantity` in the WHERE clause) followed by the order and
//! item inserts. A concurrent checkout that drained the stock makes the
//! decrement match zero rows, which aborts the transaction before anything
//! is persisted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::error::ErrorKind;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Cart, CartItem, Order, OrderItem, OrderStatus, Product, User};
use crate::storage::{Catalog, CartStore, NewProduct, NewUser, OrderStore, StockDecrement, UserStore};
use crate::{CommerceError, Result};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT product_id, name, quantity, unit_price, total \
             FROM order_items WHERE order_id = $1 ORDER BY position",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }
}

fn db(e: sqlx::Error) -> CommerceError {
    CommerceError::Storage(e.to_string())
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    address: String,
    phone: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| CommerceError::Storage(format!("unknown order status: {}", self.status)))?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            address: self.address,
            phone: self.phone,
            status,
            created_at: self.created_at,
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    product_id: Uuid,
    name: String,
    quantity: i32,
    unit_price: Decimal,
    total: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_id: row.product_id,
            name: row.name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total: row.total,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, created_at) \
             VALUES ($1, $2, $3, NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }
}

#[async_trait]
impl Catalog for PgStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        product.validate()?;
        let sku = product
            .sku
            .unwrap_or_else(|| format!("SKU-{:08}", rand::random::<u32>()));
        sqlx::query_as::<_, Product>(
            "INSERT INTO products (id, sku, name, description, price, currency, stock, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.currency.unwrap_or_else(|| "USD".to_string()))
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn list_products(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;
        Ok((products, total.0))
    }

    async fn update_product(&self, id: Uuid, product: NewProduct) -> Result<Product> {
        product.validate()?;
        sqlx::query_as::<_, Product>(
            "UPDATE products SET sku = COALESCE($2, sku), name = $3, description = $4, \
             price = $5, currency = COALESCE($6, currency), stock = $7, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.currency)
        .bind(product.stock)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or(CommerceError::ProductNotFound(id))
    }

    async fn delete_product(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        if res.rows_affected() == 0 {
            return Err(CommerceError::ProductNotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_cart(&self, user_id: Uuid) -> Result<Cart> {
        let rows = sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT product_id, quantity FROM cart_items \
             WHERE user_id = $1 ORDER BY added_at, product_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        Ok(Cart {
            user_id,
            items: rows
                .into_iter()
                .map(|(product_id, quantity)| CartItem { product_id, quantity })
                .collect(),
        })
    }

    async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<Cart> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity);
        }
        sqlx::query(
            "INSERT INTO cart_items (id, user_id, product_id, quantity, added_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (user_id, product_id) \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // A foreign key violation means the user or product is gone.
            if let Some(dbe) = e.as_database_error() {
                if matches!(dbe.kind(), ErrorKind::ForeignKeyViolation) {
                    return if dbe.constraint().is_some_and(|c| c.contains("product")) {
                        CommerceError::ProductNotFound(product_id)
                    } else {
                        CommerceError::UserNotFound(user_id)
                    };
                }
            }
            db(e)
        })?;
        self.get_cart(user_id).await
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn save_order(&self, order: &Order, decrements: &[StockDecrement]) -> Result<Order> {
        if order.items.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        let mut tx = self.pool.begin().await.map_err(db)?;

        for d in decrements {
            let res = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(d.product_id)
            .bind(d.quantity)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
            if res.rows_affected() == 0 {
                // Dropping the transaction rolls back prior decrements.
                return Err(CommerceError::Transaction(format!(
                    "stock decrement conflict for product {}",
                    d.product_id
                )));
            }
        }

        sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, address, phone, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(&order.address)
        .bind(&order.phone)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, name, quantity, unit_price, total, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::now_v7())
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit()
            .await
            .map_err(|e| CommerceError::Transaction(e.to_string()))?;
        Ok(order.clone())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        match row {
            Some(row) => {
                let items = self.order_items(row.id).await?;
                Ok(Some(row.into_order(items)?))
            }
            None => Ok(None),
        }
    }

    async fn list_orders(&self, limit: i64, offset: i64) -> Result<(Vec<Order>, i64)> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.order_items(row.id).await?;
            orders.push(row.into_order(items)?);
        }
        Ok((orders, total.0))
    }
}
