//! Timeline milestones.
//!
//! Milestones are append-only. The store writes each draft in the same
//! transaction as the change it records, and reads them back in creation
//! order so a client can replay a group's history.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use rust_decimal::Decimal;

/// Kind of lifecycle event a milestone records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneType {
    /// Group created.
    GroupCreated,
    /// A buyer joined.
    MemberJoined,
    /// A buyer withdrew.
    MemberWithdrawn,
    /// A buyer committed.
    MemberCommitted,
    /// Buyer count reached the target.
    TargetReached,
    /// Organizer started negotiation.
    NegotiationStarted,
    /// Developer made an offer.
    OfferReceived,
    /// An offer was accepted.
    OfferAccepted,
    /// A member's payment settled.
    PaymentReceived,
    /// Deal closed.
    GroupClosed,
    /// Deadline passed.
    GroupExpired,
}

impl MilestoneType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroupCreated => "GROUP_CREATED",
            Self::MemberJoined => "MEMBER_JOINED",
            Self::MemberWithdrawn => "MEMBER_WITHDRAWN",
            Self::MemberCommitted => "MEMBER_COMMITTED",
            Self::TargetReached => "TARGET_REACHED",
            Self::NegotiationStarted => "NEGOTIATION_STARTED",
            Self::OfferReceived => "OFFER_RECEIVED",
            Self::OfferAccepted => "OFFER_ACCEPTED",
            Self::PaymentReceived => "PAYMENT_RECEIVED",
            Self::GroupClosed => "GROUP_CLOSED",
            Self::GroupExpired => "GROUP_EXPIRED",
        }
    }
}

impl fmt::Display for MilestoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A milestone ready to be appended to a group's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneDraft {
    /// Group the milestone belongs to.
    pub group_id: Uuid,
    /// Event kind.
    pub milestone_type: MilestoneType,
    /// Short title.
    pub title: String,
    /// Human-readable detail.
    pub description: Option<String>,
}

impl MilestoneDraft {
    fn new(group_id: Uuid, milestone_type: MilestoneType, title: &str, description: String) -> Self {
        Self {
            group_id,
            milestone_type,
            title: title.to_string(),
            description: Some(description),
        }
    }

    /// `GROUP_CREATED`.
    #[must_use]
    pub fn group_created(group_id: Uuid, organizer_name: &str) -> Self {
        Self::new(
            group_id,
            MilestoneType::GroupCreated,
            "Group Created",
            format!("{organizer_name} created this group"),
        )
    }

    /// `MEMBER_JOINED`.
    #[must_use]
    pub fn member_joined(group_id: Uuid, buyer_name: &str) -> Self {
        Self::new(
            group_id,
            MilestoneType::MemberJoined,
            "New Member Joined",
            format!("{buyer_name} joined the group"),
        )
    }

    /// `MEMBER_WITHDRAWN`.
    #[must_use]
    pub fn member_withdrawn(group_id: Uuid, buyer_name: &str) -> Self {
        Self::new(
            group_id,
            MilestoneType::MemberWithdrawn,
            "Member Withdrew",
            format!("{buyer_name} left the group"),
        )
    }

    /// `MEMBER_COMMITTED`.
    #[must_use]
    pub fn member_committed(group_id: Uuid, buyer_name: &str) -> Self {
        Self::new(
            group_id,
            MilestoneType::MemberCommitted,
            "Member Committed",
            format!("{buyer_name} committed to buy"),
        )
    }

    /// `TARGET_REACHED`.
    #[must_use]
    pub fn target_reached(group_id: Uuid, target: i32) -> Self {
        Self::new(
            group_id,
            MilestoneType::TargetReached,
            "Target Reached",
            format!("Group reached its target of {target} buyers"),
        )
    }

    /// `NEGOTIATION_STARTED`.
    #[must_use]
    pub fn negotiation_started(group_id: Uuid) -> Self {
        Self::new(
            group_id,
            MilestoneType::NegotiationStarted,
            "Negotiation Started",
            "Started negotiation with developer".to_string(),
        )
    }

    /// `OFFER_RECEIVED`.
    #[must_use]
    pub fn offer_received(group_id: Uuid, discount_percent: Decimal) -> Self {
        Self::new(
            group_id,
            MilestoneType::OfferReceived,
            "Offer Received",
            format!("Developer offered {}% discount", discount_percent.normalize()),
        )
    }

    /// `OFFER_ACCEPTED`.
    #[must_use]
    pub fn offer_accepted(group_id: Uuid, discount_percent: Decimal) -> Self {
        Self::new(
            group_id,
            MilestoneType::OfferAccepted,
            "Offer Accepted",
            format!("Group accepted {}% discount", discount_percent.normalize()),
        )
    }

    /// `PAYMENT_RECEIVED`.
    #[must_use]
    pub fn payment_received(group_id: Uuid) -> Self {
        Self::new(
            group_id,
            MilestoneType::PaymentReceived,
            "Payment Received",
            "A member has completed their payment".to_string(),
        )
    }

    /// `GROUP_CLOSED`.
    #[must_use]
    pub fn group_closed(group_id: Uuid) -> Self {
        Self::new(
            group_id,
            MilestoneType::GroupClosed,
            "Group Closed",
            "The group purchase has been closed".to_string(),
        )
    }

    /// `GROUP_EXPIRED`.
    #[must_use]
    pub fn group_expired(group_id: Uuid) -> Self {
        Self::new(
            group_id,
            MilestoneType::GroupExpired,
            "Group Expired",
            "The group deadline passed before a deal was reached".to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_offer_received_formats_discount() {
        let draft = MilestoneDraft::offer_received(Uuid::nil(), dec!(5.50));
        assert_eq!(draft.milestone_type, MilestoneType::OfferReceived);
        assert_eq!(draft.title, "Offer Received");
        assert_eq!(
            draft.description.as_deref(),
            Some("Developer offered 5.5% discount")
        );
    }

    #[test]
    fn test_member_joined_uses_name() {
        let draft = MilestoneDraft::member_joined(Uuid::nil(), "Priya");
        assert_eq!(draft.description.as_deref(), Some("Priya joined the group"));
    }

    #[test]
    fn test_type_wire_names() {
        assert_eq!(MilestoneType::TargetReached.as_str(), "TARGET_REACHED");
        assert_eq!(
            serde_json::to_string(&MilestoneType::PaymentReceived).unwrap(),
            "\"PAYMENT_RECEIVED\""
        );
    }
}
