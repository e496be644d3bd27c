//! Order confirmation boundary.
//!
//! Notification runs after the order has committed and is strictly
//! best-effort: the orchestrator logs a failure and moves on, it never rolls
//! the order back.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::{Order, OrderConfirmation};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("failed to encode confirmation: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to publish confirmation: {0}")]
    Publish(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_confirmation(&self, order: &Order) -> Result<(), NotifyError>;
}

/// Publishes the confirmation event to NATS for downstream consumers
/// (mailer, webhooks).
pub struct NatsNotifier {
    client: async_nats::Client,
    subject: String,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client, subject: "orders.confirmed".to_string() }
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn order_confirmation(&self, order: &Order) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(&OrderConfirmation::from(order))?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))
    }
}

/// Fallback when no NATS server is configured: logs the confirmation and
/// reports success.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_confirmation(&self, order: &Order) -> Result<(), NotifyError> {
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total(),
            "order confirmation (no notification channel configured)"
        );
        Ok(())
    }
}
