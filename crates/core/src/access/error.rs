//! Access guard errors.

use thiserror::Error;

use crate::access::role::{Capability, Role};

/// Errors produced by the access guard.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The caller's role does not grant the capability.
    #[error("Role {role} lacks capability {capability}")]
    MissingCapability {
        /// The caller's role.
        role: Role,
        /// The capability that was required.
        capability: Capability,
    },

    /// The resource belongs to another tenant.
    #[error("Resource belongs to another tenant")]
    TenantMismatch,

    /// Only the group's creator or an administrator may manage it.
    #[error("Only the group organizer or an administrator may manage this group")]
    NotGroupManager,

    /// The token carried a role the system does not know.
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

impl AccessError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TenantMismatch => 404,
            Self::MissingCapability { .. } | Self::NotGroupManager | Self::UnknownRole(_) => 403,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCapability { .. } | Self::NotGroupManager | Self::UnknownRole(_) => {
                "FORBIDDEN"
            }
            Self::TenantMismatch => "NOT_FOUND",
        }
    }
}
