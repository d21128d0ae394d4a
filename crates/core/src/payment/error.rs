//! Payment error types.

use thiserror::Error;
use uuid::Uuid;

use crate::access::AccessError;
use crate::group::types::GroupStatus;

/// Errors that can occur while creating intents or reconciling events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// Group absent, inactive, or in another tenant.
    #[error("Group not found: {0}")]
    GroupNotFound(Uuid),

    /// Transaction absent or owned by another user.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// The group does not take payments in its current status.
    #[error("Cannot accept payment while group is {status}")]
    InvalidState {
        /// The group's status.
        status: GroupStatus,
    },

    /// The payer holds no live membership in the group.
    #[error("User {user_id} is not an active member of group {group_id}")]
    NotAMember {
        /// The group.
        group_id: Uuid,
        /// The payer.
        user_id: Uuid,
    },

    /// Capability check failed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The gateway rejected the request or answered badly.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// The gateway did not answer within the configured timeout.
    #[error("Payment gateway timed out")]
    GatewayTimeout,

    /// Webhook signature missing, malformed, stale or wrong.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Webhook payload could not be parsed.
    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),

    /// Store failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl PaymentError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::GroupNotFound(_) | Self::TransactionNotFound(_) => 404,
            Self::InvalidState { .. }
            | Self::NotAMember { .. }
            | Self::Validation(_)
            | Self::InvalidSignature(_)
            | Self::MalformedEvent(_) => 400,
            Self::Forbidden(_) => 403,
            Self::Gateway(_) | Self::GatewayTimeout => 502,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::NotAMember { .. } => "NOT_A_MEMBER",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::GatewayTimeout => "GATEWAY_TIMEOUT",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::MalformedEvent(_) => "MALFORMED_EVENT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Maps an access failure on a specific group.
    #[must_use]
    pub fn from_access(err: AccessError, group_id: Uuid) -> Self {
        match err {
            AccessError::TenantMismatch => Self::GroupNotFound(group_id),
            other => Self::Forbidden(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_failures_are_bad_gateway() {
        assert_eq!(PaymentError::GatewayTimeout.status_code(), 502);
        assert_eq!(PaymentError::Gateway("declined".into()).status_code(), 502);
    }

    #[test]
    fn test_webhook_rejections_are_bad_request() {
        assert_eq!(
            PaymentError::InvalidSignature("stale".into()).status_code(),
            400
        );
        assert_eq!(PaymentError::MalformedEvent("x".into()).error_code(), "MALFORMED_EVENT");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = PaymentError::InvalidState {
            status: GroupStatus::Closed,
        };
        assert_eq!(err.to_string(), "Cannot accept payment while group is CLOSED");
    }
}
