//! Offer validation and acceptance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{AccessGuard, Identity};
use crate::group::error::GroupError;
use crate::group::lifecycle::{GroupAction, GroupLifecycle};
use crate::group::types::{GroupSnapshot, OfferType};

/// Input for recording an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferInput {
    /// Initial or counter offer.
    pub offer_type: OfferType,
    /// Discount in percent, `0 < d <= 100`.
    pub discount_percent: Decimal,
    /// Minimum buyers the offer requires.
    pub min_buyers: i32,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl OfferInput {
    /// Validates the offer terms.
    ///
    /// # Errors
    ///
    /// Returns `GroupError::Validation` for an out-of-range discount, a
    /// discount finer than hundredths of a percent, or a non-positive buyer
    /// minimum.
    pub fn validate(&self) -> Result<(), GroupError> {
        if self.discount_percent <= Decimal::ZERO || self.discount_percent > Decimal::ONE_HUNDRED {
            return Err(GroupError::Validation(
                "discountPercent must be greater than 0 and at most 100".to_string(),
            ));
        }
        if self.discount_percent.normalize().scale() > 2 {
            return Err(GroupError::Validation(
                "discountPercent allows at most two decimal places".to_string(),
            ));
        }
        if self.min_buyers < 1 {
            return Err(GroupError::Validation(
                "minBuyers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The fields of an offer acceptance needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferSnapshot {
    /// Offer id.
    pub id: Uuid,
    /// Group the offer was made to.
    pub group_id: Uuid,
    /// Offered discount.
    pub discount_percent: Decimal,
    /// Already accepted.
    pub is_accepted: bool,
}

/// Stateless negotiation rules.
pub struct NegotiationService;

impl NegotiationService {
    /// Check that an offer may be recorded on the group.
    ///
    /// # Errors
    ///
    /// * `GroupNotFound` if the group is deactivated or in another tenant
    /// * `Forbidden` if the caller cannot manage the group
    /// * `Validation` for bad offer terms
    /// * `InvalidState` unless the group is `Negotiating`
    pub fn record_offer(
        identity: &Identity,
        group: &GroupSnapshot,
        input: &OfferInput,
    ) -> Result<(), GroupError> {
        Self::require_manager(identity, group)?;
        input.validate()?;
        if !group.status.accepts_offers() {
            return Err(GroupError::InvalidState {
                operation: "record offer",
                status: group.status,
            });
        }
        Ok(())
    }

    /// Check an acceptance and return the group action to apply.
    ///
    /// # Arguments
    /// * `identity` - The caller
    /// * `group` - The group, read under lock
    /// * `offer` - The offer to accept
    /// * `group_has_accepted_offer` - Any offer on the group is already accepted
    ///
    /// # Errors
    ///
    /// * `GroupNotFound` / `Forbidden` as for [`Self::record_offer`]
    /// * `InvalidState` if the offer belongs to another group, or unless
    ///   the group is `Negotiating`
    /// * `OfferAlreadyAccepted` if the group already accepted an offer
    pub fn accept_offer(
        identity: &Identity,
        group: &GroupSnapshot,
        offer: &OfferSnapshot,
        group_has_accepted_offer: bool,
    ) -> Result<GroupAction, GroupError> {
        Self::require_manager(identity, group)?;
        if offer.group_id != group.id {
            return Err(GroupError::InvalidState {
                operation: "accept an offer from another group",
                status: group.status,
            });
        }
        if offer.is_accepted || group_has_accepted_offer {
            return Err(GroupError::OfferAlreadyAccepted(group.id));
        }
        GroupLifecycle::accept_offer(group.status, offer.id, offer.discount_percent)
    }

    fn require_manager(identity: &Identity, group: &GroupSnapshot) -> Result<(), GroupError> {
        if !group.is_active {
            return Err(GroupError::GroupNotFound(group.id));
        }
        AccessGuard::require_group_manager(identity, group.tenant_id, group.created_by_id)
            .map_err(|e| GroupError::from_access(e, group.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::group::types::GroupStatus;
    use rust_decimal_macros::dec;

    fn organizer() -> Identity {
        Identity::new(Uuid::new_v4(), Uuid::new_v4(), Role::Organizer)
    }

    fn group_for(owner: &Identity, status: GroupStatus) -> GroupSnapshot {
        GroupSnapshot {
            id: Uuid::new_v4(),
            tenant_id: owner.tenant_id,
            status,
            is_active: true,
            target_buyers_count: 2,
            current_buyers_count: 2,
            deadline: None,
            created_by_id: owner.user_id,
        }
    }

    fn input(discount: Decimal) -> OfferInput {
        OfferInput {
            offer_type: OfferType::Initial,
            discount_percent: discount,
            min_buyers: 10,
            notes: None,
        }
    }

    #[test]
    fn test_record_offer_while_negotiating() {
        let owner = organizer();
        let group = group_for(&owner, GroupStatus::Negotiating);
        assert!(NegotiationService::record_offer(&owner, &group, &input(dec!(3.0))).is_ok());
    }

    #[test]
    fn test_record_offer_requires_negotiating() {
        let owner = organizer();
        let group = group_for(&owner, GroupStatus::Open);
        assert_eq!(
            NegotiationService::record_offer(&owner, &group, &input(dec!(3.0))),
            Err(GroupError::InvalidState {
                operation: "record offer",
                status: GroupStatus::Open,
            })
        );
    }

    #[test]
    fn test_record_offer_rejects_buyer() {
        let owner = organizer();
        let group = group_for(&owner, GroupStatus::Negotiating);
        let buyer = Identity::new(Uuid::new_v4(), owner.tenant_id, Role::Buyer);
        assert!(matches!(
            NegotiationService::record_offer(&buyer, &group, &input(dec!(3.0))),
            Err(GroupError::Forbidden(_))
        ));
    }

    #[test]
    fn test_record_offer_other_tenant_is_not_found() {
        let owner = organizer();
        let group = group_for(&owner, GroupStatus::Negotiating);
        let admin = Identity::new(Uuid::new_v4(), Uuid::new_v4(), Role::PartnerAdmin);
        assert_eq!(
            NegotiationService::record_offer(&admin, &group, &input(dec!(3.0))),
            Err(GroupError::GroupNotFound(group.id))
        );
    }

    #[test]
    fn test_offer_validation() {
        assert!(input(dec!(0)).validate().is_err());
        assert!(input(dec!(100.01)).validate().is_err());
        assert!(input(dec!(100)).validate().is_ok());
        let mut no_buyers = input(dec!(5));
        no_buyers.min_buyers = 0;
        assert!(no_buyers.validate().is_err());
    }

    #[test]
    fn test_offer_discount_precision() {
        assert!(input(dec!(5.25)).validate().is_ok());
        assert!(input(dec!(5.2500)).validate().is_ok());
        assert_eq!(
            input(dec!(5.125)).validate(),
            Err(GroupError::Validation(
                "discountPercent allows at most two decimal places".to_string()
            ))
        );
    }

    #[test]
    fn test_accept_offer() {
        let owner = organizer();
        let group = group_for(&owner, GroupStatus::Negotiating);
        let offer = OfferSnapshot {
            id: Uuid::new_v4(),
            group_id: group.id,
            discount_percent: dec!(5.5),
            is_accepted: false,
        };
        let action = NegotiationService::accept_offer(&owner, &group, &offer, false).unwrap();
        assert_eq!(
            action,
            GroupAction::AcceptOffer {
                new_status: GroupStatus::OfferAccepted,
                offer_id: offer.id,
                negotiated_discount: dec!(5.5),
            }
        );
    }

    #[test]
    fn test_accept_offer_from_other_group() {
        let owner = organizer();
        let group = group_for(&owner, GroupStatus::Negotiating);
        let offer = OfferSnapshot {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            discount_percent: dec!(5.5),
            is_accepted: false,
        };
        let err = NegotiationService::accept_offer(&owner, &group, &offer, false).unwrap_err();
        assert_eq!(
            err,
            GroupError::InvalidState {
                operation: "accept an offer from another group",
                status: GroupStatus::Negotiating,
            }
        );
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_STATE");
    }

    #[test]
    fn test_accept_second_offer_conflicts() {
        let owner = organizer();
        let group = group_for(&owner, GroupStatus::Negotiating);
        let offer = OfferSnapshot {
            id: Uuid::new_v4(),
            group_id: group.id,
            discount_percent: dec!(4),
            is_accepted: false,
        };
        assert_eq!(
            NegotiationService::accept_offer(&owner, &group, &offer, true),
            Err(GroupError::OfferAlreadyAccepted(group.id))
        );
    }
}
