//! Property-based tests for webhook reconciliation.

use proptest::prelude::*;

use crate::payment::reconciliation::{Reconciliation, ReconciliationService};
use crate::payment::types::{GatewayEvent, GatewayEventKind, TransactionStatus};

fn arb_kind() -> impl Strategy<Value = GatewayEventKind> {
    prop_oneof![
        Just(GatewayEventKind::IntentSucceeded),
        Just(GatewayEventKind::IntentFailed),
        Just(GatewayEventKind::IntentCanceled),
    ]
}

fn event(kind: GatewayEventKind) -> GatewayEvent {
    GatewayEvent {
        id: "evt".to_string(),
        kind,
        intent_id: "pi".to_string(),
        charge_id: Some("ch".to_string()),
        failure_message: None,
    }
}

/// Applies a delivery sequence the way the store does and counts effects.
fn replay(deliveries: &[GatewayEventKind]) -> (TransactionStatus, usize, usize) {
    let mut status = TransactionStatus::Pending;
    let mut completions = 0;
    let mut transitions = 0;
    for kind in deliveries {
        let decision = ReconciliationService::decide(status, &event(*kind));
        if let Some(next) = ReconciliationService::target_status(&decision) {
            transitions += 1;
            if matches!(decision, Reconciliation::Complete { .. }) {
                completions += 1;
            }
            status = next;
        }
    }
    (status, completions, transitions)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any delivery sequence settles the transaction at most once.
    #[test]
    fn prop_at_most_one_transition(deliveries in prop::collection::vec(arb_kind(), 0..20)) {
        let (status, completions, transitions) = replay(&deliveries);
        prop_assert!(transitions <= 1);
        prop_assert!(completions <= 1);
        prop_assert_eq!(transitions == 0, deliveries.is_empty());
        prop_assert_eq!(status.is_settled(), !deliveries.is_empty());
    }

    /// The first delivery decides the final status; redeliveries change nothing.
    #[test]
    fn prop_first_delivery_wins(
        first in arb_kind(),
        rest in prop::collection::vec(arb_kind(), 0..10),
    ) {
        let mut deliveries = vec![first];
        deliveries.extend(rest);
        let (status, _, _) = replay(&deliveries);
        let expected = match first {
            GatewayEventKind::IntentSucceeded => TransactionStatus::Completed,
            GatewayEventKind::IntentFailed | GatewayEventKind::IntentCanceled => {
                TransactionStatus::Failed
            }
        };
        prop_assert_eq!(status, expected);
    }
}
