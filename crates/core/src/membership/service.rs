//! Membership decisions over a locked group snapshot.

use uuid::Uuid;

use crate::group::error::GroupError;
use crate::group::lifecycle::GroupLifecycle;
use crate::group::types::{CommitmentStatus, GroupSnapshot};

/// Result of a successful join check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPlan {
    /// Count after the join.
    pub new_count: i32,
    /// The join brings the count up to the target.
    pub target_reached: bool,
}

/// Result of a successful withdraw check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawPlan {
    /// Count after the withdrawal.
    pub new_count: i32,
    /// The member's status before withdrawing.
    pub previous_status: CommitmentStatus,
}

/// What a confirmed payment does to the paying member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEffect {
    /// Move the member to `Paid`.
    MarkPaid,
    /// Already `Paid`; nothing to do.
    AlreadyPaid,
    /// The member left before the payment settled. The transaction still
    /// completes but the membership stays withdrawn.
    MemberWithdrawn,
}

/// Stateless membership rules.
pub struct MembershipService;

impl MembershipService {
    /// Check a join request.
    ///
    /// # Arguments
    /// * `group` - The group, read under lock
    /// * `user_id` - The joining user
    /// * `existing` - The user's current membership status, if any
    ///
    /// # Errors
    ///
    /// * `GroupNotFound` if the group is deactivated
    /// * `InvalidState` if the group is not `Open`
    /// * `AlreadyMember` if any membership exists, withdrawn ones included
    pub fn join(
        group: &GroupSnapshot,
        user_id: Uuid,
        existing: Option<CommitmentStatus>,
    ) -> Result<JoinPlan, GroupError> {
        if !group.is_active {
            return Err(GroupError::GroupNotFound(group.id));
        }
        if !group.status.accepts_joins() {
            return Err(GroupError::InvalidState {
                operation: "join",
                status: group.status,
            });
        }
        if existing.is_some() {
            return Err(GroupError::AlreadyMember {
                group_id: group.id,
                user_id,
            });
        }

        let new_count = group.current_buyers_count + 1;
        Ok(JoinPlan {
            new_count,
            target_reached: GroupLifecycle::target_reached(
                group.current_buyers_count,
                new_count,
                group.target_buyers_count,
            ),
        })
    }

    /// Check a withdraw request.
    ///
    /// # Errors
    ///
    /// * `GroupNotFound` if the group is deactivated
    /// * `InvalidState` if the group is closed or expired
    /// * `MemberNotFound` if the user never joined
    /// * `InvalidMemberState` if the member has paid or already withdrew
    pub fn withdraw(
        group: &GroupSnapshot,
        user_id: Uuid,
        existing: Option<CommitmentStatus>,
    ) -> Result<WithdrawPlan, GroupError> {
        let status = Self::live_member(group, user_id, existing, "withdraw")?;
        match status {
            CommitmentStatus::Interested | CommitmentStatus::Committed => Ok(WithdrawPlan {
                new_count: (group.current_buyers_count - 1).max(0),
                previous_status: status,
            }),
            CommitmentStatus::Paid | CommitmentStatus::Withdrawn => {
                Err(GroupError::InvalidMemberState {
                    operation: "withdraw",
                    status,
                })
            }
        }
    }

    /// Check a commit request and return the new status.
    ///
    /// # Errors
    ///
    /// Same as [`Self::withdraw`], plus `InvalidMemberState` unless the member
    /// is `Interested`.
    pub fn commit(
        group: &GroupSnapshot,
        user_id: Uuid,
        existing: Option<CommitmentStatus>,
    ) -> Result<CommitmentStatus, GroupError> {
        match Self::live_member(group, user_id, existing, "commit")? {
            CommitmentStatus::Interested => Ok(CommitmentStatus::Committed),
            status => Err(GroupError::InvalidMemberState {
                operation: "commit",
                status,
            }),
        }
    }

    /// Decide how a completed payment affects the paying member.
    #[must_use]
    pub fn payment_effect(current: CommitmentStatus) -> PaymentEffect {
        match current {
            CommitmentStatus::Interested | CommitmentStatus::Committed => PaymentEffect::MarkPaid,
            CommitmentStatus::Paid => PaymentEffect::AlreadyPaid,
            CommitmentStatus::Withdrawn => PaymentEffect::MemberWithdrawn,
        }
    }

    fn live_member(
        group: &GroupSnapshot,
        user_id: Uuid,
        existing: Option<CommitmentStatus>,
        operation: &'static str,
    ) -> Result<CommitmentStatus, GroupError> {
        if !group.is_active {
            return Err(GroupError::GroupNotFound(group.id));
        }
        if !group.status.accepts_member_changes() {
            return Err(GroupError::InvalidState {
                operation,
                status: group.status,
            });
        }
        existing.ok_or(GroupError::MemberNotFound {
            group_id: group.id,
            user_id,
        })
    }
}
