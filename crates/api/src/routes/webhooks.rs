//! Payment gateway webhook endpoint.
//!
//! Deliveries are verified against the endpoint secret before parsing. Any
//! event the store absorbs, including unknown intents and duplicates, is
//! acknowledged with 200 so the gateway stops retrying; a store failure
//! answers 500 so it retries.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use serde_json::json;

use groupbuy_core::payment::{ParsedWebhook, parse_event};
use groupbuy_db::repositories::WebhookOutcome;

use super::error::map_payment_error;
use crate::AppState;

/// Header carrying the `t=<unix>,v1=<hex>` signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Creates webhook routes. These are public; authenticity comes from the signature.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/gateway", post(gateway_webhook))
}

fn received() -> Response {
    (StatusCode::OK, Json(json!({ "received": true }))).into_response()
}

/// POST /webhooks/gateway
async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = state
        .webhook_verifier
        .verify(&body, signature, Utc::now().timestamp())
    {
        tracing::warn!(error = %e, "Rejected webhook delivery");
        return map_payment_error(&e);
    }

    let event = match parse_event(&body) {
        Ok(ParsedWebhook::Intent(event)) => event,
        Ok(ParsedWebhook::Unhandled { event_type }) => {
            tracing::debug!(event_type = %event_type, "Ignoring unhandled webhook event");
            return received();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed webhook delivery");
            return map_payment_error(&e);
        }
    };

    match state.payments().handle_webhook_event(&event).await {
        Ok(outcome) => {
            if let WebhookOutcome::Applied { transaction_id, status } = outcome {
                tracing::debug!(
                    event_id = %event.id,
                    transaction_id = %transaction_id,
                    status = status.as_str(),
                    "Webhook applied"
                );
            }
            received()
        }
        Err(e) => map_payment_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TEST_WEBHOOK_SECRET, test_state};
    use axum::{body::Body, http::Request};
    use groupbuy_core::payment::WebhookVerifier;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = test_state();
        Router::new().merge(routes()).with_state(state)
    }

    fn signed(payload: &str) -> String {
        WebhookVerifier::new(TEST_WEBHOOK_SECRET, 300)
            .sign(payload.as_bytes(), Utc::now().timestamp())
            .unwrap()
    }

    async fn deliver(payload: &str, signature: Option<String>) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri("/webhooks/gateway")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        app()
            .oneshot(request.body(Body::from(payload.to_string())).unwrap())
            .await
            .unwrap()
    }

    const SUCCEEDED: &str = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_123","latest_charge":"ch_1"}}}"#;

    #[rstest]
    #[case::missing(None)]
    #[case::garbage(Some("nonsense".to_string()))]
    #[case::wrong_secret(Some(
        WebhookVerifier::new("another-secret", 300)
            .sign(SUCCEEDED.as_bytes(), Utc::now().timestamp())
            .unwrap()
    ))]
    #[case::stale(Some(
        WebhookVerifier::new(TEST_WEBHOOK_SECRET, 300)
            .sign(SUCCEEDED.as_bytes(), Utc::now().timestamp() - 3600)
            .unwrap()
    ))]
    #[tokio::test]
    async fn test_bad_signature_is_rejected(#[case] signature: Option<String>) {
        let response = deliver(SUCCEEDED, signature).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "INVALID_SIGNATURE");
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let payload = "not json";
        let response = deliver(payload, Some(signed(payload))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unhandled_event_is_acknowledged() {
        let payload = r#"{"id":"evt_2","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
        let response = deliver(payload, Some(signed(payload))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["received"], true);
    }

    #[tokio::test]
    async fn test_store_failure_asks_for_retry() {
        let response = deliver(SUCCEEDED, Some(signed(SUCCEEDED))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
