//! Property-based tests for the group state machine.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::group::lifecycle::GroupLifecycle;
use crate::group::types::{GroupSnapshot, GroupStatus};

fn arb_status() -> impl Strategy<Value = GroupStatus> {
    prop_oneof![
        Just(GroupStatus::Open),
        Just(GroupStatus::Negotiating),
        Just(GroupStatus::OfferAccepted),
        Just(GroupStatus::Closed),
        Just(GroupStatus::Expired),
    ]
}

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Discount between 0.01 and 100.00.
fn arb_discount() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_800_000_000, 0).unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every action the machine produces is a listed transition.
    #[test]
    fn prop_actions_are_valid_transitions(
        status in arb_status(),
        offer_id in arb_uuid(),
        discount in arb_discount(),
    ) {
        let now = base_time();
        let results = [
            GroupLifecycle::start_negotiation(status, now),
            GroupLifecycle::accept_offer(status, offer_id, discount),
            GroupLifecycle::close(status),
        ];
        for action in results.into_iter().flatten() {
            prop_assert!(GroupLifecycle::is_valid_transition(status, action.new_status()));
        }
    }

    /// Terminal groups reject every manual transition.
    #[test]
    fn prop_terminal_states_are_final(
        status in prop_oneof![Just(GroupStatus::Closed), Just(GroupStatus::Expired)],
        target in arb_status(),
        offer_id in arb_uuid(),
        discount in arb_discount(),
    ) {
        let now = base_time();
        prop_assert!(GroupLifecycle::start_negotiation(status, now).is_err());
        prop_assert!(GroupLifecycle::accept_offer(status, offer_id, discount).is_err());
        prop_assert!(GroupLifecycle::close(status).is_err());
        prop_assert!(GroupLifecycle::request_status(status, target, now).is_err());
        prop_assert!(!GroupLifecycle::is_valid_transition(status, target));
    }

    /// Accepted discount equals the offer's discount.
    #[test]
    fn prop_accept_preserves_discount(offer_id in arb_uuid(), discount in arb_discount()) {
        let action = GroupLifecycle::accept_offer(GroupStatus::Negotiating, offer_id, discount).unwrap();
        match action {
            crate::group::lifecycle::GroupAction::AcceptOffer { negotiated_discount, .. } => {
                prop_assert_eq!(negotiated_discount, discount);
            }
            _ => prop_assert!(false, "Expected AcceptOffer action"),
        }
    }

    /// Expiry fires exactly for overdue open or negotiating groups.
    #[test]
    fn prop_expiry_matches_deadline(
        status in arb_status(),
        offset_minutes in -10_000i64..10_000i64,
        has_deadline in any::<bool>(),
    ) {
        let now = base_time();
        let deadline = has_deadline.then(|| now + Duration::minutes(offset_minutes));
        let group = GroupSnapshot {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            status,
            is_active: true,
            target_buyers_count: 5,
            current_buyers_count: 0,
            deadline,
            created_by_id: Uuid::nil(),
        };

        let expected = status.can_expire() && has_deadline && offset_minutes <= 0;
        let action = GroupLifecycle::check_expiry(&group, now);
        prop_assert_eq!(action.is_some(), expected);
        if let Some(action) = action {
            prop_assert_eq!(action.new_status(), GroupStatus::Expired);
        }
    }

    /// Target reached fires at most once along any increasing count sequence.
    #[test]
    fn prop_target_reached_fires_once(target in 1i32..50, joins in 0i32..100) {
        let fired = (0..joins)
            .filter(|count| GroupLifecycle::target_reached(*count, count + 1, target))
            .count();
        prop_assert_eq!(fired, usize::from(joins >= target));
    }
}
