//! Stock validation.

use crate::domain::Product;
use crate::{CommerceError, Result};

/// Checks that `requested` units of `product` can be sold right now.
///
/// Pure decision logic with no side effects. The authoritative re-check
/// happens inside the order commit transaction; this guard exists to reject
/// doomed checkouts before a transaction is opened and to distinguish a
/// missing stock value from a sold-out one.
pub fn ensure_available(product: &Product, requested: i32) -> Result<()> {
    match product.stock {
        None => Err(CommerceError::UndefinedStock {
            product_id: product.id,
            name: product.name.clone(),
        }),
        Some(available) if requested > available => Err(CommerceError::OutOfStock {
            product_id: product.id,
            name: product.name.clone(),
            requested,
            available,
        }),
        Some(_) => Ok(()),
    }
}
