//! In-memory store.
//!
//! Backs the test suite and the no-database fallback in `main`. A single
//! mutex over the whole state makes `save_order` atomic: every decrement is
//! re-validated against current stock before any of them is applied.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Cart, Order, Product, User};
use crate::storage::{Catalog, CartStore, NewProduct, NewUser, OrderStore, StockDecrement, UserStore};
use crate::{CommerceError, Result};

use async_trait::async_trait;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    orders: Vec<Order>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let user = User {
            id: Uuid::now_v7(),
            name: user.name,
            email: user.email,
            created_at: Utc::now(),
        };
        self.lock().users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let product = new_product_record(product)?;
        self.lock().products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.lock().products.get(&id).cloned())
    }

    async fn list_products(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
        let state = self.lock();
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = products.len() as i64;
        let page = products
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_product(&self, id: Uuid, patch: NewProduct) -> Result<Product> {
        patch.validate()?;
        let mut state = self.lock();
        let existing = state
            .products
            .get_mut(&id)
            .ok_or(CommerceError::ProductNotFound(id))?;
        if let Some(sku) = patch.sku {
            existing.sku = sku;
        }
        existing.name = patch.name;
        existing.description = patch.description;
        existing.price = patch.price;
        if let Some(currency) = patch.currency {
            existing.currency = currency;
        }
        existing.stock = patch.stock;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete_product(&self, id: Uuid) -> Result<()> {
        self.lock()
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(CommerceError::ProductNotFound(id))
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_cart(&self, user_id: Uuid) -> Result<Cart> {
        Ok(self
            .lock()
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id)))
    }

    async fn add_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<Cart> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity);
        }
        let mut state = self.lock();
        if !state.users.contains_key(&user_id) {
            return Err(CommerceError::UserNotFound(user_id));
        }
        if !state.products.contains_key(&product_id) {
            return Err(CommerceError::ProductNotFound(product_id));
        }
        let cart = state
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::empty(user_id));
        cart.add_item(product_id, quantity);
        Ok(cart.clone())
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
        if let Some(cart) = self.lock().carts.get_mut(&user_id) {
            cart.items.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn save_order(&self, order: &Order, decrements: &[StockDecrement]) -> Result<Order> {
        if order.items.is_empty() {
            return Err(CommerceError::EmptyCart);
        }
        let mut state = self.lock();

        // Validate every decrement before touching any stock value.
        for d in decrements {
            let product = state.products.get(&d.product_id).ok_or_else(|| {
                CommerceError::Transaction(format!("product {} vanished during commit", d.product_id))
            })?;
            match product.stock {
                None => {
                    return Err(CommerceError::UndefinedStock {
                        product_id: product.id,
                        name: product.name.clone(),
                    })
                }
                Some(available) if d.quantity > available => {
                    return Err(CommerceError::OutOfStock {
                        product_id: product.id,
                        name: product.name.clone(),
                        requested: d.quantity,
                        available,
                    })
                }
                Some(_) => {}
            }
        }

        for d in decrements {
            if let Some(product) = state.products.get_mut(&d.product_id) {
                product.stock = product.stock.map(|s| s - d.quantity);
                product.updated_at = Utc::now();
            }
        }

        state.orders.push(order.clone());
        Ok(order.clone())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, limit: i64, offset: i64) -> Result<(Vec<Order>, i64)> {
        let state = self.lock();
        let total = state.orders.len() as i64;
        let page = state
            .orders
            .iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

fn new_product_record(product: NewProduct) -> Result<Product> {
    product.validate()?;
    let now = Utc::now();
    Ok(Product {
        id: Uuid::now_v7(),
        sku: product
            .sku
            .unwrap_or_else(|| format!("SKU-{:08}", rand::random::<u32>())),
        name: product.name,
        description: product.description,
        price: product.price,
        currency: product.currency.unwrap_or_else(|| "USD".to_string()),
        stock: product.stock,
        created_at: now,
        updated_at: now,
    })
}
