//! Group domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::group::error::GroupError;

/// Group status in the purchase lifecycle.
///
/// Valid transitions:
/// - Open → Negotiating (organizer starts negotiation)
/// - Negotiating → OfferAccepted (an offer is accepted)
/// - OfferAccepted → Closed (organizer closes the deal)
/// - Open | Negotiating → Expired (deadline passed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupStatus {
    /// Accepting new members.
    Open,
    /// Collecting developer offers.
    Negotiating,
    /// A discount has been agreed.
    OfferAccepted,
    /// Deal closed (terminal).
    Closed,
    /// Deadline passed before a deal (terminal).
    Expired,
}

impl GroupStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Negotiating => "NEGOTIATING",
            Self::OfferAccepted => "OFFER_ACCEPTED",
            Self::Closed => "CLOSED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "NEGOTIATING" => Some(Self::Negotiating),
            "OFFER_ACCEPTED" => Some(Self::OfferAccepted),
            "CLOSED" => Some(Self::Closed),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Only open groups take new members.
    #[must_use]
    pub fn accepts_joins(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Offers are recorded and accepted only during negotiation.
    #[must_use]
    pub fn accepts_offers(&self) -> bool {
        matches!(self, Self::Negotiating)
    }

    /// Payments are taken once negotiation has begun and until the deal closes.
    #[must_use]
    pub fn accepts_payments(&self) -> bool {
        matches!(self, Self::Negotiating | Self::OfferAccepted)
    }

    /// Members may withdraw or commit while the group is still live.
    #[must_use]
    pub fn accepts_member_changes(&self) -> bool {
        !self.is_terminal()
    }

    /// Deadline passage only affects groups without an agreed deal.
    #[must_use]
    pub fn can_expire(&self) -> bool {
        matches!(self, Self::Open | Self::Negotiating)
    }

    /// Returns true for `Closed` and `Expired`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Expired)
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member's stage in the payment funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentStatus {
    /// Joined, no commitment yet.
    Interested,
    /// Declared intent to buy.
    Committed,
    /// Payment confirmed by the gateway.
    Paid,
    /// Left the group.
    Withdrawn,
}

impl CommitmentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interested => "INTERESTED",
            Self::Committed => "COMMITTED",
            Self::Paid => "PAID",
            Self::Withdrawn => "WITHDRAWN",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INTERESTED" => Some(Self::Interested),
            "COMMITTED" => Some(Self::Committed),
            "PAID" => Some(Self::Paid),
            "WITHDRAWN" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    /// Counts toward `current_buyers_count`.
    #[must_use]
    pub fn is_counted(&self) -> bool {
        !matches!(self, Self::Withdrawn)
    }
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of developer offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferType {
    /// Developer's opening offer.
    Initial,
    /// Revised offer after pushback.
    Counter,
}

impl OfferType {
    /// Returns the string representation of the offer type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::Counter => "COUNTER",
        }
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of a group the state machine and guards need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    /// Group id.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Current status.
    pub status: GroupStatus,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Informational buyer target.
    pub target_buyers_count: i32,
    /// Non-withdrawn members.
    pub current_buyers_count: i32,
    /// Optional deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Organizer who created the group.
    pub created_by_id: Uuid,
}

impl GroupSnapshot {
    /// Returns true if the deadline has passed and the status can still expire.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.can_expire() && self.deadline.is_some_and(|deadline| deadline <= now)
    }
}

/// Input for creating a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    /// Target project.
    pub project_id: Uuid,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Buyer target, at least one.
    pub target_buyers_count: i32,
    /// Per-buyer commitment amount in major units.
    pub commitment_amount: Option<Decimal>,
    /// Optional deadline.
    pub deadline: Option<DateTime<Utc>>,
}

impl NewGroup {
    /// Validates the input against the current time.
    ///
    /// # Errors
    ///
    /// Returns `GroupError::Validation` describing the first invalid field.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), GroupError> {
        validate_name(&self.name)?;
        validate_target(self.target_buyers_count)?;
        validate_commitment(self.commitment_amount)?;
        validate_deadline(self.deadline, now)
    }
}

/// Partial update of group details.
///
/// `status` is a requested transition, applied through the state machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChanges {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New buyer target.
    pub target_buyers_count: Option<i32>,
    /// New commitment amount.
    pub commitment_amount: Option<Decimal>,
    /// New deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Requested status transition.
    pub status: Option<GroupStatus>,
}

impl GroupChanges {
    /// Returns true if no field changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.target_buyers_count.is_none()
            && self.commitment_amount.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
    }

    /// Validates the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns `GroupError::Validation` describing the first invalid field.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), GroupError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(target) = self.target_buyers_count {
            validate_target(target)?;
        }
        validate_commitment(self.commitment_amount)?;
        validate_deadline(self.deadline, now)
    }
}

fn validate_name(name: &str) -> Result<(), GroupError> {
    if name.trim().is_empty() {
        return Err(GroupError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_target(target: i32) -> Result<(), GroupError> {
    if target < 1 {
        return Err(GroupError::Validation(
            "targetBuyersCount must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_commitment(amount: Option<Decimal>) -> Result<(), GroupError> {
    if amount.is_some_and(|a| a <= Decimal::ZERO) {
        return Err(GroupError::Validation(
            "commitmentAmount must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_deadline(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), GroupError> {
    if deadline.is_some_and(|d| d <= now) {
        return Err(GroupError::Validation(
            "deadline must be in the future".to_string(),
        ));
    }
    Ok(())
}
