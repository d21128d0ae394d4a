//! Payment gateway clients.
//!
//! [`PaymentGateway`] is the seam between intent creation and the external
//! provider. [`HttpPaymentGateway`] speaks the Stripe payment intents API;
//! [`MockPaymentGateway`] mints local ids for development and tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use groupbuy_shared::config::GatewayConfig;

use crate::payment::error::PaymentError;
use crate::payment::types::{IntentRequest, PaymentIntent};

/// Mints payment intents at an external provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent.
    ///
    /// Implementations must bound the call with a timeout and report it as
    /// `PaymentError::GatewayTimeout`.
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError>;
}

/// Stripe-compatible HTTP gateway.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl HttpPaymentGateway {
    /// Build a client from gateway settings.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Gateway` if the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn form_fields(request: &IntentRequest) -> Vec<(String, String)> {
        let mut fields = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency.clone()),
            ("description".to_string(), request.description.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        fields.extend(
            request
                .metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
        );
        fields
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&Self::form_fields(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::GatewayTimeout
                } else {
                    PaymentError::Gateway(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("gateway returned {status}"));
            return Err(PaymentError::Gateway(message));
        }

        let intent: IntentResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Gateway(e.to_string()))?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Gateway("intent has no client secret".to_string()))?;

        tracing::debug!(intent_id = %intent.id, "Gateway intent created");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockMode {
    Succeed,
    Fail,
    Timeout,
}

/// In-process gateway for development and tests.
pub struct MockPaymentGateway {
    mode: MockMode,
    calls: AtomicUsize,
    requests: Mutex<Vec<IntentRequest>>,
}

impl MockPaymentGateway {
    /// A gateway that always mints an intent.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(MockMode::Succeed)
    }

    /// A gateway that always rejects the request.
    #[must_use]
    pub fn failing() -> Self {
        Self::with_mode(MockMode::Fail)
    }

    /// A gateway that always times out.
    #[must_use]
    pub fn timing_out() -> Self {
        Self::with_mode(MockMode::Timeout)
    }

    fn with_mode(mode: MockMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of `create_intent` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<IntentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.mode {
            MockMode::Succeed => {
                let id = format!("pi_mock_{}", uuid::Uuid::new_v4().simple());
                let client_secret = format!("{id}_secret_mock");
                tracing::info!(intent_id = %id, amount = request.amount_minor, "Mock intent created");
                Ok(PaymentIntent { id, client_secret })
            }
            MockMode::Fail => Err(PaymentError::Gateway("mock gateway declined".to_string())),
            MockMode::Timeout => Err(PaymentError::GatewayTimeout),
        }
    }
}
