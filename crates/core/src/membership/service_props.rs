//! Property-based tests for the buyer count invariant.

use proptest::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::group::types::{CommitmentStatus, GroupSnapshot, GroupStatus};
use crate::membership::service::MembershipService;

#[derive(Debug, Clone, Copy)]
enum Op {
    Join(u8),
    Withdraw(u8),
    Commit(u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Join),
        (0u8..8).prop_map(Op::Withdraw),
        (0u8..8).prop_map(Op::Commit),
    ]
}

fn user(n: u8) -> Uuid {
    Uuid::from_u128(u128::from(n) + 1)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// After any sequence of joins, withdrawals and commits, the stored count
    /// equals the number of non-withdrawn members, and a rejected operation
    /// leaves both untouched.
    #[test]
    fn prop_count_matches_non_withdrawn_members(
        ops in prop::collection::vec(arb_op(), 0..60),
        target in 1i32..6,
    ) {
        let mut group = GroupSnapshot {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            status: GroupStatus::Open,
            is_active: true,
            target_buyers_count: target,
            current_buyers_count: 0,
            deadline: None,
            created_by_id: Uuid::nil(),
        };
        let mut members: HashMap<Uuid, CommitmentStatus> = HashMap::new();

        for op in ops {
            let before = (group.current_buyers_count, members.clone());
            match op {
                Op::Join(n) => {
                    let id = user(n);
                    if let Ok(plan) = MembershipService::join(&group, id, members.get(&id).copied()) {
                        members.insert(id, CommitmentStatus::Interested);
                        group.current_buyers_count = plan.new_count;
                        prop_assert_eq!(
                            plan.target_reached,
                            plan.new_count == group.target_buyers_count
                        );
                    } else {
                        prop_assert_eq!(&before, &(group.current_buyers_count, members.clone()));
                    }
                }
                Op::Withdraw(n) => {
                    let id = user(n);
                    if let Ok(plan) = MembershipService::withdraw(&group, id, members.get(&id).copied()) {
                        members.insert(id, CommitmentStatus::Withdrawn);
                        group.current_buyers_count = plan.new_count;
                    }
                }
                Op::Commit(n) => {
                    let id = user(n);
                    if let Ok(status) = MembershipService::commit(&group, id, members.get(&id).copied()) {
                        members.insert(id, status);
                    }
                }
            }

            let live = members.values().filter(|s| s.is_counted()).count();
            prop_assert_eq!(usize::try_from(group.current_buyers_count).unwrap(), live);
        }
    }
}
