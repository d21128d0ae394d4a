//! Errors for group, membership and negotiation operations.

use thiserror::Error;
use uuid::Uuid;

use crate::access::AccessError;
use crate::group::types::{CommitmentStatus, GroupStatus};

/// Errors that can occur while mutating or reading a group.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GroupError {
    /// Group absent, inactive, or in another tenant.
    #[error("Group not found: {0}")]
    GroupNotFound(Uuid),

    /// Project absent or in another tenant.
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    /// Offer absent.
    #[error("Offer not found: {0}")]
    OfferNotFound(Uuid),

    /// The user holds no membership in the group.
    #[error("User {user_id} is not a member of group {group_id}")]
    MemberNotFound {
        /// The group.
        group_id: Uuid,
        /// The user.
        user_id: Uuid,
    },

    /// The operation is not legal in the group's current status.
    #[error("Cannot {operation} while group is {status}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// The group's status.
        status: GroupStatus,
    },

    /// The state machine does not allow this transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: GroupStatus,
        /// The attempted target status.
        to: GroupStatus,
    },

    /// The operation is not legal for the member's commitment status.
    #[error("Cannot {operation} while membership is {status}")]
    InvalidMemberState {
        /// Operation that was attempted.
        operation: &'static str,
        /// The member's commitment status.
        status: CommitmentStatus,
    },

    /// A membership already exists for this user, including a withdrawn one.
    #[error("User {user_id} already has a membership in group {group_id}")]
    AlreadyMember {
        /// The group.
        group_id: Uuid,
        /// The user.
        user_id: Uuid,
    },

    /// The group already has an accepted offer.
    #[error("Group {0} already has an accepted offer")]
    OfferAlreadyAccepted(Uuid),

    /// Capability check failed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl GroupError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::GroupNotFound(_)
            | Self::ProjectNotFound(_)
            | Self::OfferNotFound(_)
            | Self::MemberNotFound { .. } => 404,
            Self::InvalidState { .. }
            | Self::InvalidTransition { .. }
            | Self::InvalidMemberState { .. }
            | Self::Validation(_) => 400,
            Self::AlreadyMember { .. } | Self::OfferAlreadyAccepted(_) => 409,
            Self::Forbidden(_) => 403,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            Self::OfferNotFound(_) => "OFFER_NOT_FOUND",
            Self::MemberNotFound { .. } => "MEMBER_NOT_FOUND",
            Self::InvalidState { .. } | Self::InvalidMemberState { .. } => "INVALID_STATE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyMember { .. } => "ALREADY_MEMBER",
            Self::OfferAlreadyAccepted(_) => "OFFER_ALREADY_ACCEPTED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Maps an access failure on a specific group.
    ///
    /// Cross-tenant access reads as absence so group ids do not leak.
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
    use crate::access::{Capability, Role};
    use rstest::rstest;

    #[rstest]
    #[case(GroupError::GroupNotFound(Uuid::nil()), 404)]
    #[case(GroupError::InvalidState { operation: "join", status: GroupStatus::Negotiating }, 400)]
    #[case(GroupError::AlreadyMember { group_id: Uuid::nil(), user_id: Uuid::nil() }, 409)]
    #[case(GroupError::OfferAlreadyAccepted(Uuid::nil()), 409)]
    #[case(GroupError::Forbidden("x".to_string()), 403)]
    #[case(GroupError::Database("x".to_string()), 500)]
    fn test_status_codes(#[case] err: GroupError, #[case] expected: u16) {
        assert_eq!(err.status_code(), expected);
    }

    #[test]
    fn test_invalid_state_message() {
        let err = GroupError::InvalidState {
            operation: "join",
            status: GroupStatus::Closed,
        };
        assert_eq!(err.to_string(), "Cannot join while group is CLOSED");
        assert_eq!(err.error_code(), "INVALID_STATE");
    }

    #[test]
    fn test_from_access() {
        let group_id = Uuid::new_v4();
        assert_eq!(
            GroupError::from_access(AccessError::TenantMismatch, group_id),
            GroupError::GroupNotFound(group_id)
        );
        let err = GroupError::from_access(
            AccessError::MissingCapability {
                role: Role::Buyer,
                capability: Capability::GroupUpdate,
            },
            group_id,
        );
        assert_eq!(err.status_code(), 403);
    }
}
