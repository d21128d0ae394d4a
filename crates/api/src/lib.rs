//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - JWT authentication middleware resolving the caller's identity
//! - The payment gateway webhook endpoint

pub mod middleware;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use groupbuy_core::payment::{PaymentGateway, WebhookVerifier};
use groupbuy_db::{
    GroupRepository, MembershipRepository, NegotiationRepository, PaymentRepository,
    TimelineRepository,
};
use groupbuy_shared::JwtService;
use groupbuy_shared::types::Currency;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Payment gateway client.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Webhook signature verifier.
    pub webhook_verifier: Arc<WebhookVerifier>,
    /// Settlement currency for new payment intents.
    pub currency: Currency,
}

impl AppState {
    pub(crate) fn groups(&self) -> GroupRepository {
        GroupRepository::new((*self.db).clone())
    }

    pub(crate) fn memberships(&self) -> MembershipRepository {
        MembershipRepository::new((*self.db).clone())
    }

    pub(crate) fn negotiations(&self) -> NegotiationRepository {
        NegotiationRepository::new((*self.db).clone())
    }

    pub(crate) fn timeline(&self) -> TimelineRepository {
        TimelineRepository::new((*self.db).clone())
    }

    pub(crate) fn payments(&self) -> PaymentRepository {
        PaymentRepository::new((*self.db).clone(), self.gateway.clone(), self.currency)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
