//! Roles and the capabilities they grant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete permission checked by the access guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Browse projects.
    ProjectRead,
    /// View groups, members, offers and timelines.
    GroupRead,
    /// Create a new group.
    GroupCreate,
    /// Change group details, drive negotiation and close groups.
    GroupUpdate,
    /// Deactivate a group.
    GroupDelete,
    /// Join, commit to and withdraw from groups.
    GroupJoin,
    /// Start a payment into a group.
    PaymentCreate,
    /// View analytics.
    AnalyticsRead,
}

impl Capability {
    /// Returns the `resource:action` form of the capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectRead => "project:read",
            Self::GroupRead => "group:read",
            Self::GroupCreate => "group:create",
            Self::GroupUpdate => "group:update",
            Self::GroupDelete => "group:delete",
            Self::GroupJoin => "group:join",
            Self::PaymentCreate => "payment:create",
            Self::AnalyticsRead => "analytics:read",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User role within a tenant.
///
/// Roles are ordered from lowest to highest privilege, but capabilities are
/// not strictly cumulative: administrators manage groups without joining them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Prospective buyer.
    Buyer = 0,
    /// Forms and runs purchase groups.
    Organizer = 1,
    /// Administrator of a partner tenant.
    PartnerAdmin = 2,
    /// Platform administrator across all tenants.
    SuperAdmin = 3,
}

const BUYER_CAPABILITIES: &[Capability] = &[
    Capability::ProjectRead,
    Capability::GroupRead,
    Capability::GroupJoin,
    Capability::PaymentCreate,
];

const ORGANIZER_CAPABILITIES: &[Capability] = &[
    Capability::ProjectRead,
    Capability::GroupRead,
    Capability::GroupCreate,
    Capability::GroupUpdate,
    Capability::GroupJoin,
    Capability::PaymentCreate,
    Capability::AnalyticsRead,
];

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::ProjectRead,
    Capability::GroupRead,
    Capability::GroupCreate,
    Capability::GroupUpdate,
    Capability::GroupDelete,
    Capability::AnalyticsRead,
];

impl Role {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUYER" => Some(Self::Buyer),
            "ORGANIZER" => Some(Self::Organizer),
            "PARTNER_ADMIN" => Some(Self::PartnerAdmin),
            "SUPER_ADMIN" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "BUYER",
            Self::Organizer => "ORGANIZER",
            Self::PartnerAdmin => "PARTNER_ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Returns every capability granted to this role.
    #[must_use]
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Buyer => BUYER_CAPABILITIES,
            Self::Organizer => ORGANIZER_CAPABILITIES,
            Self::PartnerAdmin | Self::SuperAdmin => ADMIN_CAPABILITIES,
        }
    }

    /// Returns true if the role grants the capability.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Administrators manage any group in their scope, not only their own.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        *self >= Self::PartnerAdmin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Role::Buyer, Capability::GroupJoin, true)]
    #[case(Role::Buyer, Capability::GroupRead, true)]
    #[case(Role::Buyer, Capability::PaymentCreate, true)]
    #[case(Role::Buyer, Capability::GroupCreate, false)]
    #[case(Role::Buyer, Capability::GroupUpdate, false)]
    #[case(Role::Organizer, Capability::GroupCreate, true)]
    #[case(Role::Organizer, Capability::GroupUpdate, true)]
    #[case(Role::Organizer, Capability::GroupJoin, true)]
    #[case(Role::Organizer, Capability::GroupDelete, false)]
    #[case(Role::PartnerAdmin, Capability::GroupDelete, true)]
    #[case(Role::PartnerAdmin, Capability::GroupUpdate, true)]
    #[case(Role::PartnerAdmin, Capability::GroupJoin, false)]
    #[case(Role::SuperAdmin, Capability::GroupDelete, true)]
    #[case(Role::SuperAdmin, Capability::PaymentCreate, false)]
    fn test_capability_table(
        #[case] role: Role,
        #[case] capability: Capability,
        #[case] expected: bool,
    ) {
        assert_eq!(role.has(capability), expected);
    }

    #[test]
    fn test_role_parse_round_trip() {
        for role in [
            Role::Buyer,
            Role::Organizer,
            Role::PartnerAdmin,
            Role::SuperAdmin,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("partner_admin"), Some(Role::PartnerAdmin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Buyer < Role::Organizer);
        assert!(Role::Organizer < Role::PartnerAdmin);
        assert!(Role::PartnerAdmin < Role::SuperAdmin);
        assert!(!Role::Organizer.is_admin());
        assert!(Role::PartnerAdmin.is_admin());
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(Capability::GroupJoin.to_string(), "group:join");
        assert_eq!(Capability::PaymentCreate.to_string(), "payment:create");
    }
}
