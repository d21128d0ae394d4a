//! Groupbuy API Server
//!
//! Main entry point for the Groupbuy backend service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groupbuy_api::{AppState, create_router};
use groupbuy_core::payment::{
    HttpPaymentGateway, MockPaymentGateway, PaymentGateway, WebhookVerifier,
};
use groupbuy_db::{GroupRepository, connect_with_pool};
use groupbuy_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groupbuy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let gateway: Arc<dyn PaymentGateway> = if config.gateway.mock {
        tracing::warn!("Using mock payment gateway");
        Arc::new(MockPaymentGateway::new())
    } else {
        Arc::new(HttpPaymentGateway::new(&config.gateway)?)
    };
    let webhook_verifier = WebhookVerifier::from_config(&config.gateway)?;
    let currency = config.gateway.currency()?;
    info!(
        api_base = %config.gateway.api_base,
        currency = %currency,
        mock = config.gateway.mock,
        "Payment gateway configured"
    );

    spawn_expiry_sweep(
        GroupRepository::new(db.clone()),
        Duration::from_secs(config.lifecycle.expiry_sweep_interval_secs.max(1)),
    );

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        gateway,
        webhook_verifier: Arc::new(webhook_verifier),
        currency,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically expires open and negotiating groups past their deadline.
fn spawn_expiry_sweep(groups: GroupRepository, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match groups.expire_overdue(None, chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(expired) => info!(expired, "Expiry sweep expired groups"),
                Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
            }
        }
    });
}
