//! Intent preparation and webhook reconciliation decisions.
//!
//! The transaction's gateway intent id is the idempotency key: the store
//! looks the transaction up by it, asks [`ReconciliationService::decide`]
//! what to do given the current status, and applies the result with an
//! update guarded on that same status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use groupbuy_shared::types::{Currency, Money};

use crate::access::{AccessGuard, Capability, Identity};
use crate::group::types::{CommitmentStatus, GroupSnapshot, GroupStatus};
use crate::payment::error::PaymentError;
use crate::payment::types::{
    GatewayEvent, GatewayEventKind, IntentRequest, TransactionStatus, TransactionType,
};

/// Client input for a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentInput {
    /// Group being paid into.
    pub group_id: Uuid,
    /// Amount in major units.
    pub amount: Decimal,
    /// What the payment is for.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

/// What to do with a transaction when an event arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// `Pending → Completed`; mark the member paid.
    Complete {
        /// Charge id to record.
        charge_id: Option<String>,
    },
    /// `Pending → Failed`; membership untouched.
    Fail {
        /// Gateway message, for the log.
        reason: Option<String>,
    },
    /// Already settled; the delivery is a duplicate or arrived out of order.
    AlreadySettled {
        /// The status the transaction already holds.
        status: TransactionStatus,
    },
}

/// Stateless payment rules.
pub struct ReconciliationService;

impl ReconciliationService {
    /// Validate a payment and build the gateway request.
    ///
    /// # Arguments
    /// * `identity` - The payer
    /// * `group` - The group being paid into
    /// * `membership` - The payer's commitment status in the group, if any
    /// * `input` - Amount and type
    /// * `project_name` - Used in the description and metadata
    /// * `currency` - Configured settlement currency
    /// * `transaction_id` - Id the local transaction will get; also the idempotency key
    /// * `now` - Current time, checked against the group deadline
    ///
    /// # Errors
    ///
    /// * `Forbidden` if the role cannot pay
    /// * `GroupNotFound` if the group is inactive or in another tenant
    /// * `InvalidState` unless the group is negotiating or has accepted an
    ///   offer, or if its deadline has passed
    /// * `NotAMember` if the payer never joined or withdrew
    /// * `Validation` if the amount is not positive or has sub-minor precision
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_intent(
        identity: &Identity,
        group: &GroupSnapshot,
        membership: Option<CommitmentStatus>,
        input: &IntentInput,
        project_name: &str,
        currency: Currency,
        transaction_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<IntentRequest, PaymentError> {
        AccessGuard::require(identity, Capability::PaymentCreate)
            .map_err(|e| PaymentError::from_access(e, group.id))?;
        AccessGuard::require_tenant(identity, group.tenant_id)
            .map_err(|e| PaymentError::from_access(e, group.id))?;
        if !group.is_active {
            return Err(PaymentError::GroupNotFound(group.id));
        }
        if group.is_overdue(now) {
            return Err(PaymentError::InvalidState {
                status: GroupStatus::Expired,
            });
        }
        if !group.status.accepts_payments() {
            return Err(PaymentError::InvalidState {
                status: group.status,
            });
        }
        if !membership.is_some_and(|status| status.is_counted()) {
            return Err(PaymentError::NotAMember {
                group_id: group.id,
                user_id: identity.user_id,
            });
        }

        let amount_minor = Self::minor_units(input.amount, currency)?;

        let mut metadata = BTreeMap::new();
        metadata.insert("userId".to_string(), identity.user_id.to_string());
        metadata.insert("groupId".to_string(), group.id.to_string());
        metadata.insert("tenantId".to_string(), group.tenant_id.to_string());
        metadata.insert("transactionId".to_string(), transaction_id.to_string());
        metadata.insert("type".to_string(), input.transaction_type.to_string());
        metadata.insert("projectName".to_string(), project_name.to_string());

        Ok(IntentRequest {
            amount_minor,
            currency: currency.gateway_code().to_string(),
            description: format!("{} for {project_name}", input.transaction_type),
            metadata,
            idempotency_key: transaction_id.to_string(),
        })
    }

    /// Converts a major-unit amount to minor units.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Validation` for non-positive amounts or amounts
    /// finer than one minor unit.
    pub fn minor_units(amount: Decimal, currency: Currency) -> Result<i64, PaymentError> {
        let money = Money::new(amount, currency);
        if !money.is_positive() {
            return Err(PaymentError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        money.to_minor_units().ok_or_else(|| {
            PaymentError::Validation(format!(
                "amount {amount} cannot be expressed in {currency} minor units"
            ))
        })
    }

    /// Decide how an event affects a transaction in `current` status.
    ///
    /// Settled transactions never change again: a repeated `succeeded` is a
    /// duplicate, and a `succeeded` after `failed` (or the reverse) is an
    /// out-of-order delivery that is acknowledged without effect.
    #[must_use]
    pub fn decide(current: TransactionStatus, event: &GatewayEvent) -> Reconciliation {
        match (current, event.kind) {
            (TransactionStatus::Pending, GatewayEventKind::IntentSucceeded) => {
                Reconciliation::Complete {
                    charge_id: event.charge_id.clone(),
                }
            }
            (
                TransactionStatus::Pending,
                GatewayEventKind::IntentFailed | GatewayEventKind::IntentCanceled,
            ) => Reconciliation::Fail {
                reason: event.failure_message.clone(),
            },
            (status, _) => Reconciliation::AlreadySettled { status },
        }
    }

    /// The status a decision moves the transaction to, if any.
    #[must_use]
    pub fn target_status(decision: &Reconciliation) -> Option<TransactionStatus> {
        match decision {
            Reconciliation::Complete { .. } => Some(TransactionStatus::Completed),
            Reconciliation::Fail { .. } => Some(TransactionStatus::Failed),
            Reconciliation::AlreadySettled { .. } => None,
        }
    }
}
