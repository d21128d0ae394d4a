//! Payment intents and gateway reconciliation.
//!
//! # Modules
//!
//! - `types` - Transaction status, gateway events, intent requests
//! - `error` - Payment-specific errors
//! - `reconciliation` - Intent preparation and webhook event decisions
//! - `gateway` - Gateway trait with HTTP and mock implementations
//! - `webhook` - Signature verification and event parsing

pub mod error;
pub mod gateway;
pub mod reconciliation;
pub mod types;
pub mod webhook;

#[cfg(test)]
mod reconciliation_props;

pub use error::PaymentError;
pub use gateway::{HttpPaymentGateway, MockPaymentGateway, PaymentGateway};
pub use reconciliation::{IntentInput, Reconciliation, ReconciliationService};
pub use types::{
    GatewayEvent, GatewayEventKind, IntentRequest, ParsedWebhook, PaymentIntent,
    TransactionStatus, TransactionType,
};
pub use webhook::{WebhookVerifier, parse_event};
