//! Identity context and capability checks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use groupbuy_shared::Claims;

use crate::access::error::AccessError;
use crate::access::role::{Capability, Role};

/// The caller as resolved by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Authenticated user.
    pub user_id: Uuid,
    /// Tenant the user acts in.
    pub tenant_id: Uuid,
    /// Role within the tenant.
    pub role: Role,
    /// Display name for timeline entries.
    pub display_name: Option<String>,
}

impl Identity {
    /// Creates an identity without a display name.
    #[must_use]
    pub const fn new(user_id: Uuid, tenant_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
            display_name: None,
        }
    }

    /// Resolves an identity from verified token claims.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::UnknownRole` if the role claim is not recognized.
    pub fn from_claims(claims: &Claims) -> Result<Self, AccessError> {
        let role =
            Role::parse(&claims.role).ok_or_else(|| AccessError::UnknownRole(claims.role.clone()))?;
        Ok(Self {
            user_id: claims.user_id(),
            tenant_id: claims.tenant_id(),
            role,
            display_name: claims.name.clone(),
        })
    }

    /// Name to show in timeline entries, with a role-based fallback.
    #[must_use]
    pub fn display_name_or(&self, fallback: &'static str) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Stateless capability checks.
pub struct AccessGuard;

impl AccessGuard {
    /// Requires the identity's role to grant a capability.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::MissingCapability` if it does not.
    pub fn require(identity: &Identity, capability: Capability) -> Result<(), AccessError> {
        if identity.role.has(capability) {
            Ok(())
        } else {
            Err(AccessError::MissingCapability {
                role: identity.role,
                capability,
            })
        }
    }

    /// Requires the resource to live in the identity's tenant.
    ///
    /// Super admins may act across tenants.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::TenantMismatch` otherwise.
    pub fn require_tenant(identity: &Identity, tenant_id: Uuid) -> Result<(), AccessError> {
        if identity.role == Role::SuperAdmin || identity.tenant_id == tenant_id {
            Ok(())
        } else {
            Err(AccessError::TenantMismatch)
        }
    }

    /// Requires the identity to manage a specific group.
    ///
    /// Managing means holding `GroupUpdate` and being either the group's
    /// creator or an administrator, within the group's tenant.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn require_group_manager(
        identity: &Identity,
        group_tenant_id: Uuid,
        created_by_id: Uuid,
    ) -> Result<(), AccessError> {
        Self::require_tenant(identity, group_tenant_id)?;
        Self::require(identity, Capability::GroupUpdate)?;
        if identity.role.is_admin() || identity.user_id == created_by_id {
            Ok(())
        } else {
            Err(AccessError::NotGroupManager)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn identity(role: Role) -> Identity {
        Identity::new(Uuid::new_v4(), Uuid::new_v4(), role)
    }

    #[test]
    fn test_require_capability() {
        let buyer = identity(Role::Buyer);
        assert!(AccessGuard::require(&buyer, Capability::GroupJoin).is_ok());
        assert_eq!(
            AccessGuard::require(&buyer, Capability::GroupCreate),
            Err(AccessError::MissingCapability {
                role: Role::Buyer,
                capability: Capability::GroupCreate,
            })
        );
    }

    #[test]
    fn test_require_tenant() {
        let organizer = identity(Role::Organizer);
        assert!(AccessGuard::require_tenant(&organizer, organizer.tenant_id).is_ok());
        assert_eq!(
            AccessGuard::require_tenant(&organizer, Uuid::new_v4()),
            Err(AccessError::TenantMismatch)
        );

        let super_admin = identity(Role::SuperAdmin);
        assert!(AccessGuard::require_tenant(&super_admin, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_group_manager_creator_organizer() {
        let organizer = identity(Role::Organizer);
        assert!(
            AccessGuard::require_group_manager(
                &organizer,
                organizer.tenant_id,
                organizer.user_id
            )
            .is_ok()
        );
    }

    #[test]
    fn test_group_manager_other_organizer_rejected() {
        let organizer = identity(Role::Organizer);
        assert_eq!(
            AccessGuard::require_group_manager(&organizer, organizer.tenant_id, Uuid::new_v4()),
            Err(AccessError::NotGroupManager)
        );
    }

    #[test]
    fn test_group_manager_partner_admin() {
        let admin = identity(Role::PartnerAdmin);
        assert!(
            AccessGuard::require_group_manager(&admin, admin.tenant_id, Uuid::new_v4()).is_ok()
        );
        assert_eq!(
            AccessGuard::require_group_manager(&admin, Uuid::new_v4(), Uuid::new_v4()),
            Err(AccessError::TenantMismatch)
        );
    }

    #[test]
    fn test_group_manager_buyer_rejected() {
        let buyer = identity(Role::Buyer);
        assert!(matches!(
            AccessGuard::require_group_manager(&buyer, buyer.tenant_id, buyer.user_id),
            Err(AccessError::MissingCapability { .. })
        ));
    }

    #[test]
    fn test_identity_from_claims() {
        let claims = Claims::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "PARTNER_ADMIN",
            Utc::now() + Duration::minutes(5),
        )
        .with_name("Meera");

        let identity = Identity::from_claims(&claims).unwrap();
        assert_eq!(identity.user_id, claims.sub);
        assert_eq!(identity.tenant_id, claims.tid);
        assert_eq!(identity.role, Role::PartnerAdmin);
        assert_eq!(identity.display_name_or("A buyer"), "Meera");
    }

    #[test]
    fn test_identity_from_claims_unknown_role() {
        let claims = Claims::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "owner",
            Utc::now() + Duration::minutes(5),
        );
        assert_eq!(
            Identity::from_claims(&claims),
            Err(AccessError::UnknownRole("owner".to_string()))
        );
    }
}
