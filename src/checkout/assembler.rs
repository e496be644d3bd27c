//! Turns cart lines into order lines.

use crate::checkout::inventory;
use crate::domain::{Cart, OrderItem};
use crate::storage::{StockDecrement, Store};
use crate::{CommerceError, Result};

/// Resolves every cart line against the catalog, in the cart's stored order.
///
/// Each line is validated against current stock and captured with the
/// product's price at this instant. Fails fast on the first invalid line;
/// no partial output is returned. The returned decrements are applied
/// inside the same transaction that persists the order, so a concurrent
/// checkout against the same product either serializes behind it or fails.
pub async fn assemble_items(
    store: &dyn Store,
    cart: &Cart,
) -> Result<(Vec<OrderItem>, Vec<StockDecrement>)> {
    let mut items = Vec::with_capacity(cart.items.len());
    let mut decrements = Vec::with_capacity(cart.items.len());

    for line in &cart.items {
        let product = store
            .find_product(line.product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(line.product_id))?;
        inventory::ensure_available(&product, line.quantity)?;
        items.push(OrderItem::snapshot(&product, line.quantity));
        decrements.push(StockDecrement {
            product_id: product.id,
            quantity: line.quantity,
        });
    }

    Ok((items, decrements))
}
