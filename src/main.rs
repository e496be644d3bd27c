//! Ferrocart - Self-hosted E-commerce Order Service

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferrocart::api::{self, AppState};
use ferrocart::notify::{LogNotifier, NatsNotifier, Notifier};
use ferrocart::storage::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn Store> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(&url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Arc::new(PgStore::new(db))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match std::env::var("NATS_URL") {
        Ok(url) => Arc::new(NatsNotifier::new(async_nats::connect(&url).await?)),
        Err(_) => Arc::new(LogNotifier),
    };

    let app = api::router(AppState::new(store, notifier));

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("🚀 Ferrocart listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
