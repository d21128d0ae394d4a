//! Payment intent routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use groupbuy_core::payment::IntentInput;

use super::error::map_payment_error;
use crate::AppState;
use crate::middleware::AuthUser;

/// Creates payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/intent", post(create_intent))
        .route("/payments/transactions/{transaction_id}", get(get_transaction))
}

/// POST /payments/intent
async fn create_intent(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(input): Json<IntentInput>,
) -> Response {
    match state.payments().create_intent(&identity, input).await {
        Ok(created) => Json(created).into_response(),
        Err(e) => map_payment_error(&e),
    }
}

/// GET /payments/transactions/{transaction_id}
async fn get_transaction(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Response {
    match state
        .payments()
        .get_transaction(&identity, transaction_id)
        .await
    {
        Ok(transaction) => Json(transaction).into_response(),
        Err(e) => map_payment_error(&e),
    }
}
