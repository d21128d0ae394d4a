//! Webhook authenticity and parsing.
//!
//! Deliveries carry a `t=<unix>,v1=<hex>` signature header where the
//! signature is HMAC-SHA256 over `"{t}.{body}"` with the endpoint secret.
//! Verification happens before an event reaches reconciliation.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use groupbuy_shared::config::GatewayConfig;

use crate::payment::error::PaymentError;
use crate::payment::types::{GatewayEvent, GatewayEventKind, ParsedWebhook};

type HmacSha256 = Hmac<Sha256>;

/// Checks webhook signatures against the endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("enabled", &self.secret.is_some())
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    /// Verifier for a secret and a timestamp tolerance in seconds.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, tolerance_secs: i64) -> Self {
        Self {
            secret: Some(secret.into()),
            tolerance_secs,
        }
    }

    /// Verifier that accepts every delivery. Only for the mock gateway.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            secret: None,
            tolerance_secs: 0,
        }
    }

    /// Build from gateway settings.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Validation` when no webhook secret is configured
    /// for a real gateway.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, PaymentError> {
        if !config.webhook_secret.is_empty() {
            return Ok(Self::new(
                config.webhook_secret.as_bytes(),
                config.webhook_tolerance_secs,
            ));
        }
        if config.mock {
            tracing::warn!("Webhook signature verification disabled for mock gateway");
            return Ok(Self::disabled());
        }
        Err(PaymentError::Validation(
            "gateway.webhook_secret must be set unless gateway.mock is enabled".to_string(),
        ))
    }

    /// Returns true if signatures are checked.
    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify a delivery.
    ///
    /// # Arguments
    /// * `payload` - Raw request body, exactly as received
    /// * `header` - Signature header value
    /// * `now` - Current unix time in seconds
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` if the header is missing or
    /// malformed, the timestamp is outside the tolerance, or no `v1`
    /// signature matches.
    pub fn verify(&self, payload: &[u8], header: Option<&str>, now: i64) -> Result<(), PaymentError> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        let header =
            header.ok_or_else(|| PaymentError::InvalidSignature("missing header".to_string()))?;

        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<Vec<u8>> = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => {
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".to_string()))?;
        if signatures.is_empty() {
            return Err(PaymentError::InvalidSignature(
                "no v1 signature".to_string(),
            ));
        }
        if now.abs_diff(timestamp) > self.tolerance_secs.unsigned_abs() {
            return Err(PaymentError::InvalidSignature(
                "timestamp outside tolerance".to_string(),
            ));
        }

        let mac = Self::mac(secret, timestamp, payload)?;
        if signatures
            .iter()
            .any(|candidate| mac.clone().verify_slice(candidate).is_ok())
        {
            Ok(())
        } else {
            Err(PaymentError::InvalidSignature(
                "signature mismatch".to_string(),
            ))
        }
    }

    /// Produce a signature header for a payload, as the gateway would.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` if the verifier is disabled.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, PaymentError> {
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| PaymentError::InvalidSignature("verifier disabled".to_string()))?;
        let mac = Self::mac(secret, timestamp, payload)?;
        Ok(format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    fn mac(secret: &[u8], timestamp: i64, payload: &[u8]) -> Result<HmacSha256, PaymentError> {
        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct IntentObject {
    id: String,
    latest_charge: Option<serde_json::Value>,
    charges: Option<ChargeList>,
    last_payment_error: Option<PaymentErrorObject>,
    cancellation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChargeList {
    #[serde(default)]
    data: Vec<ChargeObject>,
}

#[derive(Debug, Deserialize)]
struct ChargeObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PaymentErrorObject {
    message: Option<String>,
}

impl IntentObject {
    fn charge_id(&self) -> Option<String> {
        match &self.latest_charge {
            Some(serde_json::Value::String(id)) => Some(id.clone()),
            Some(serde_json::Value::Object(charge)) => charge
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            _ => self
                .charges
                .as_ref()
                .and_then(|list| list.data.first())
                .map(|charge| charge.id.clone()),
        }
    }

    fn failure_message(&self) -> Option<String> {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.clone())
            .or_else(|| self.cancellation_reason.clone())
    }
}

/// Parse a verified webhook body.
///
/// # Errors
///
/// Returns `PaymentError::MalformedEvent` if the body is not an event, or an
/// intent event lacks its intent object.
pub fn parse_event(payload: &[u8]) -> Result<ParsedWebhook, PaymentError> {
    let envelope: EventEnvelope =
        serde_json::from_slice(payload).map_err(|e| PaymentError::MalformedEvent(e.to_string()))?;

    let Some(kind) = GatewayEventKind::from_event_type(&envelope.event_type) else {
        return Ok(ParsedWebhook::Unhandled {
            event_type: envelope.event_type,
        });
    };

    let object = envelope
        .data
        .get("object")
        .cloned()
        .ok_or_else(|| PaymentError::MalformedEvent("missing data.object".to_string()))?;
    let object: IntentObject =
        serde_json::from_value(object).map_err(|e| PaymentError::MalformedEvent(e.to_string()))?;
    if object.id.is_empty() {
        return Err(PaymentError::MalformedEvent("empty intent id".to_string()));
    }

    let charge_id = object.charge_id();
    let failure_message = object.failure_message();
    Ok(ParsedWebhook::Intent(GatewayEvent {
        id: envelope.id,
        kind,
        intent_id: object.id,
        charge_id,
        failure_message,
    }))
}
