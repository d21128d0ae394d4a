//! Developer offer routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use groupbuy_core::negotiation::OfferInput;

use super::error::map_group_error;
use crate::AppState;
use crate::middleware::AuthUser;

/// Creates offer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups/{group_id}/offers", get(list_offers).post(record_offer))
        .route(
            "/groups/{group_id}/offers/{offer_id}/accept",
            post(accept_offer),
        )
}

/// GET /groups/{group_id}/offers
async fn list_offers(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    match state.negotiations().list_offers(&identity, group_id).await {
        Ok(offers) => Json(offers).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// POST /groups/{group_id}/offers
async fn record_offer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
    Json(input): Json<OfferInput>,
) -> Response {
    match state
        .negotiations()
        .record_offer(&identity, group_id, input)
        .await
    {
        Ok(offer) => (StatusCode::CREATED, Json(offer)).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// POST /groups/{group_id}/offers/{offer_id}/accept
async fn accept_offer(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((group_id, offer_id)): Path<(Uuid, Uuid)>,
) -> Response {
    match state
        .negotiations()
        .accept_offer(&identity, group_id, offer_id)
        .await
    {
        Ok(accepted) => Json(accepted).into_response(),
        Err(e) => map_group_error(&e),
    }
}
