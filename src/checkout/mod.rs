//! Checkout workflow: converts a user's cart into a persisted order.
//!
//! The workflow has two phases with a hard boundary between them. Phase one
//! (validate, assemble, commit) is transactional: any failure leaves no
//! persisted state. Phase two (cart clear, confirmation) runs after the
//! commit and can no longer fail the order.

pub mod assembler;
pub mod inventory;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::domain::Order;
use crate::notify::Notifier;
use crate::storage::Store;
use crate::{CommerceError, Result};

/// Deadline for the atomic order commit. Expiry surfaces as a retryable
/// transaction failure; nothing has been persisted.
const COMMIT_DEADLINE: Duration = Duration::from_secs(5);

/// Upper bound on how long a slow notification channel may hold up the
/// checkout response.
const NOTIFY_DEADLINE: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Creates an order from the user's current cart.
    ///
    /// Validation failures (unknown user, empty cart, unknown product,
    /// unset or insufficient stock) abort before any persistence attempt.
    /// The order, its items, and every stock decrement commit as one atomic
    /// unit; afterwards the cart is cleared and a confirmation is attempted
    /// best-effort.
    #[instrument(skip(self, address, phone))]
    pub async fn create_order(&self, user_id: Uuid, address: &str, phone: &str) -> Result<Order> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(CommerceError::UserNotFound(user_id))?;

        let cart = self.store.get_cart(user.id).await?;
        if cart.is_empty() {
            // Checked before any product lookup: an empty cart is a client
            // input problem, not a stock problem.
            return Err(CommerceError::EmptyCart);
        }

        let mut order = Order::new(user.id, address, phone);
        let (items, decrements) = assembler::assemble_items(self.store.as_ref(), &cart).await?;
        order.items = items;
        debug!(order_id = %order.id, items = order.items.len(), "order assembled");

        let order = match timeout(COMMIT_DEADLINE, self.store.save_order(&order, &decrements)).await
        {
            Ok(saved) => saved?,
            Err(_) => return Err(CommerceError::Transaction("order commit timed out".into())),
        };

        // The order is final from here on.
        if let Err(e) = self.store.clear_cart(user.id).await {
            error!(order_id = %order.id, "failed to clear cart after commit: {e}");
        }

        match timeout(NOTIFY_DEADLINE, self.notifier.order_confirmation(&order)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(order_id = %order.id, "failed to send order confirmation: {e}"),
            Err(_) => error!(order_id = %order.id, "order confirmation timed out"),
        }

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total(),
            "order created"
        );
        Ok(order)
    }
}
