//! Payment domain types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Local transaction status.
///
/// `Pending` moves to `Completed` or `Failed` only on a verified gateway
/// event; both are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Intent created, awaiting the gateway.
    Pending,
    /// Payment captured.
    Completed,
    /// Payment failed or was canceled.
    Failed,
}

impl TransactionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a payment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Fee to hold a place in the group.
    CommitmentFee,
    /// Deposit held in escrow until closing.
    EscrowDeposit,
    /// Booking amount paid to the developer.
    BookingAmount,
}

impl TransactionType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommitmentFee => "COMMITMENT_FEE",
            Self::EscrowDeposit => "ESCROW_DEPOSIT",
            Self::BookingAmount => "BOOKING_AMOUNT",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to mint a payment intent at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Lowercase ISO currency code.
    pub currency: String,
    /// Statement description.
    pub description: String,
    /// Metadata echoed back on webhook events.
    pub metadata: BTreeMap<String, String>,
    /// Sent as `Idempotency-Key` so a retried request mints one intent.
    pub idempotency_key: String,
}

/// Intent returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Gateway intent id, the reconciliation key.
    pub id: String,
    /// Secret the client uses to confirm the payment.
    pub client_secret: String,
}

/// Payment intent outcome reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventKind {
    /// `intent.succeeded`.
    IntentSucceeded,
    /// `intent.failed`.
    IntentFailed,
    /// `intent.canceled`.
    IntentCanceled,
}

impl GatewayEventKind {
    /// Maps a gateway event type to a kind.
    ///
    /// Accepts the generic `intent.*` names and Stripe's `payment_intent.*`.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "intent.succeeded" | "payment_intent.succeeded" => Some(Self::IntentSucceeded),
            "intent.failed" | "payment_intent.payment_failed" => Some(Self::IntentFailed),
            "intent.canceled" | "payment_intent.canceled" => Some(Self::IntentCanceled),
            _ => None,
        }
    }

    /// Returns the canonical event name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntentSucceeded => "intent.succeeded",
            Self::IntentFailed => "intent.failed",
            Self::IntentCanceled => "intent.canceled",
        }
    }
}

impl fmt::Display for GatewayEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified payment intent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    /// Gateway event id.
    pub id: String,
    /// Outcome.
    pub kind: GatewayEventKind,
    /// Intent the event is about.
    pub intent_id: String,
    /// Charge id on success.
    pub charge_id: Option<String>,
    /// Gateway message on failure.
    pub failure_message: Option<String>,
}

/// A parsed webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedWebhook {
    /// A payment intent event to reconcile.
    Intent(GatewayEvent),
    /// Any other event type; acknowledged and ignored.
    Unhandled {
        /// The gateway's event type.
        event_type: String,
    },
}
