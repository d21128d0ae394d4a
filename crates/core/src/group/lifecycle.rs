//! Group state machine.
//!
//! Every function validates a transition against the current status and
//! returns the action to persist. None of them touch storage; the caller
//! applies the action and its milestone in one store transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::group::error::GroupError;
use crate::group::types::{GroupSnapshot, GroupStatus};

/// A validated status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupAction {
    /// Open → Negotiating.
    StartNegotiation {
        /// Always `Negotiating`.
        new_status: GroupStatus,
        /// Recorded as `negotiation_start`.
        started_at: DateTime<Utc>,
    },
    /// Negotiating → OfferAccepted.
    AcceptOffer {
        /// Always `OfferAccepted`.
        new_status: GroupStatus,
        /// The accepted offer.
        offer_id: Uuid,
        /// Copied to the group's `negotiated_discount`.
        negotiated_discount: Decimal,
    },
    /// OfferAccepted → Closed.
    Close {
        /// Always `Closed`.
        new_status: GroupStatus,
    },
    /// Open | Negotiating → Expired.
    Expire {
        /// Always `Expired`.
        new_status: GroupStatus,
        /// The deadline that passed.
        deadline: DateTime<Utc>,
    },
}

impl GroupAction {
    /// Returns the status the group moves to.
    #[must_use]
    pub fn new_status(&self) -> GroupStatus {
        match self {
            Self::StartNegotiation { new_status, .. }
            | Self::AcceptOffer { new_status, .. }
            | Self::Close { new_status }
            | Self::Expire { new_status, .. } => *new_status,
        }
    }
}

/// Stateless group lifecycle rules.
pub struct GroupLifecycle;

impl GroupLifecycle {
    /// Start negotiation on an open group.
    ///
    /// Reaching the buyer target does not trigger this; an organizer must.
    ///
    /// # Errors
    ///
    /// Returns `GroupError::InvalidState` unless the group is `Open`.
    pub fn start_negotiation(
        current_status: GroupStatus,
        now: DateTime<Utc>,
    ) -> Result<GroupAction, GroupError> {
        match current_status {
            GroupStatus::Open => Ok(GroupAction::StartNegotiation {
                new_status: GroupStatus::Negotiating,
                started_at: now,
            }),
            status => Err(GroupError::InvalidState {
                operation: "start negotiation",
                status,
            }),
        }
    }

    /// Accept an offer on a negotiating group.
    ///
    /// # Errors
    ///
    /// Returns `GroupError::InvalidState` unless the group is `Negotiating`.
    pub fn accept_offer(
        current_status: GroupStatus,
        offer_id: Uuid,
        discount_percent: Decimal,
    ) -> Result<GroupAction, GroupError> {
        match current_status {
            GroupStatus::Negotiating => Ok(GroupAction::AcceptOffer {
                new_status: GroupStatus::OfferAccepted,
                offer_id,
                negotiated_discount: discount_percent,
            }),
            status => Err(GroupError::InvalidState {
                operation: "accept offer",
                status,
            }),
        }
    }

    /// Close a group whose offer has been accepted.
    ///
    /// # Errors
    ///
    /// Returns `GroupError::InvalidState` unless the group is `OfferAccepted`.
    pub fn close(current_status: GroupStatus) -> Result<GroupAction, GroupError> {
        match current_status {
            GroupStatus::OfferAccepted => Ok(GroupAction::Close {
                new_status: GroupStatus::Closed,
            }),
            status => Err(GroupError::InvalidState {
                operation: "close group",
                status,
            }),
        }
    }

    /// Returns the expiry action if the group's deadline has passed.
    ///
    /// `None` means the group is unaffected: no deadline, deadline still in
    /// the future, or a status that does not expire.
    #[must_use]
    pub fn check_expiry(group: &GroupSnapshot, now: DateTime<Utc>) -> Option<GroupAction> {
        if !group.is_overdue(now) {
            return None;
        }
        group.deadline.map(|deadline| GroupAction::Expire {
            new_status: GroupStatus::Expired,
            deadline,
        })
    }

    /// Resolve a requested status from a group update.
    ///
    /// Only the manual transitions can be requested: `Negotiating` and
    /// `Closed`. Acceptance goes through an offer and expiry through time.
    ///
    /// # Errors
    ///
    /// Returns `GroupError::InvalidTransition` for any other target, or the
    /// error of the underlying transition.
    pub fn request_status(
        current_status: GroupStatus,
        requested: GroupStatus,
        now: DateTime<Utc>,
    ) -> Result<GroupAction, GroupError> {
        match requested {
            GroupStatus::Negotiating => Self::start_negotiation(current_status, now),
            GroupStatus::Closed => Self::close(current_status),
            to => Err(GroupError::InvalidTransition {
                from: current_status,
                to,
            }),
        }
    }

    /// Check if a transition is valid without performing it.
    #[must_use]
    pub fn is_valid_transition(from: GroupStatus, to: GroupStatus) -> bool {
        matches!(
            (from, to),
            (GroupStatus::Open, GroupStatus::Negotiating)
                | (GroupStatus::Negotiating, GroupStatus::OfferAccepted)
                | (GroupStatus::OfferAccepted, GroupStatus::Closed)
                | (GroupStatus::Open | GroupStatus::Negotiating, GroupStatus::Expired)
        )
    }

    /// Returns true when a join brings the count exactly to the target.
    ///
    /// Withdrawals can take the count back under the target, so the store
    /// also checks that the milestone was not already recorded.
    #[must_use]
    pub fn target_reached(previous_count: i32, new_count: i32, target: i32) -> bool {
        previous_count < target && new_count >= target
    }
}
