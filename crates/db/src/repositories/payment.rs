//! Payment repository.
//!
//! Intent creation first settles a lapsed deadline under the group lock,
//! then calls the gateway outside any database transaction and persists the
//! `PENDING` row afterwards. Webhook reconciliation locks the
//! transaction row by its gateway intent id and applies at most one status
//! change, guarded on the row still being `PENDING`.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use groupbuy_core::access::{AccessGuard, Identity};
use groupbuy_core::group::{CommitmentStatus as CoreCommitmentStatus, GroupError};
use groupbuy_core::membership::{MembershipService, PaymentEffect};
use groupbuy_core::payment::{
    GatewayEvent, IntentInput, PaymentError, PaymentGateway, Reconciliation,
    ReconciliationService, TransactionStatus as CoreTransactionStatus,
};
use groupbuy_core::timeline::MilestoneDraft;
use groupbuy_shared::types::{Currency, Money};

use crate::entities::{
    group_members, groups, projects,
    sea_orm_active_enums::{CommitmentStatus, TransactionStatus},
    transactions,
};

use super::activity::{ActivityAction, ActivityEntry, record_activity};
use super::group::{expire_if_overdue, lock_group_by_id};
use super::membership::lock_member;
use super::payment_db_err;
use super::timeline::append_milestone;

fn expiry_err(err: GroupError) -> PaymentError {
    match err {
        GroupError::Database(message) => PaymentError::Database(message),
        other => PaymentError::Database(other.to_string()),
    }
}

/// Returned to the client after an intent is minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCreated {
    /// Gateway intent id.
    pub intent_id: String,
    /// Secret the client confirms the payment with.
    pub client_secret: String,
    /// Local transaction id.
    pub transaction_id: Uuid,
}

/// What a webhook event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The transaction moved to a settled status.
    Applied {
        /// The local transaction.
        transaction_id: Uuid,
        /// Its new status.
        status: CoreTransactionStatus,
    },
    /// No local transaction carries the event's intent id.
    UnknownIntent,
    /// The transaction was already settled; nothing changed.
    Duplicate {
        /// The local transaction.
        transaction_id: Uuid,
        /// Its settled status.
        status: CoreTransactionStatus,
    },
}

/// Repository for payment intents and reconciliation.
#[derive(Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    currency: Currency,
}

impl std::fmt::Debug for PaymentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRepository")
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn PaymentGateway>, currency: Currency) -> Self {
        Self {
            db,
            gateway,
            currency,
        }
    }

    /// Mints a gateway intent and records a `PENDING` transaction.
    ///
    /// A gateway failure or timeout leaves nothing behind locally.
    ///
    /// # Errors
    ///
    /// * `Forbidden` if the role cannot pay
    /// * `GroupNotFound` if the group is missing, inactive or foreign
    /// * `InvalidState` unless the group takes payments; a group past its
    ///   deadline is expired first
    /// * `NotAMember` if the payer has no live membership
    /// * `Validation` for a bad amount
    /// * `Gateway` / `GatewayTimeout` if the provider call fails
    /// * `Database` if the transaction row cannot be written
    pub async fn create_intent(
        &self,
        identity: &Identity,
        input: IntentInput,
    ) -> Result<IntentCreated, PaymentError> {
        let group_id = input.group_id;
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(payment_db_err)?;
        let group = lock_group_by_id(&txn, group_id)
            .await
            .map_err(payment_db_err)?
            .ok_or(PaymentError::GroupNotFound(group_id))?;
        let group = if group.tenant_id == identity.tenant_id {
            expire_if_overdue(&txn, group, now)
                .await
                .map_err(expiry_err)?
        } else {
            group
        };
        txn.commit().await.map_err(payment_db_err)?;

        let membership = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id))
            .filter(group_members::Column::UserId.eq(identity.user_id))
            .one(&self.db)
            .await
            .map_err(payment_db_err)?
            .map(|m| CoreCommitmentStatus::from(m.commitment_status));

        let project = projects::Entity::find_by_id(group.project_id)
            .one(&self.db)
            .await
            .map_err(payment_db_err)?
            .ok_or(PaymentError::GroupNotFound(group_id))?;

        let transaction_id = Uuid::new_v4();
        let request = ReconciliationService::prepare_intent(
            identity,
            &group.snapshot(),
            membership,
            &input,
            &project.name,
            self.currency,
            transaction_id,
            now,
        )?;

        let intent = self.gateway.create_intent(&request).await?;

        let inserted = transactions::ActiveModel {
            id: Set(transaction_id),
            tenant_id: Set(group.tenant_id),
            user_id: Set(identity.user_id),
            group_id: Set(Some(group_id)),
            transaction_type: Set(input.transaction_type.into()),
            amount: Set(request.amount_minor),
            currency: Set(self.currency.to_string()),
            status: Set(TransactionStatus::Pending),
            gateway_intent_id: Set(intent.id.clone()),
            gateway_charge_id: Set(None),
            failure_reason: Set(None),
            description: Set(request.description.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await;

        if let Err(e) = inserted {
            tracing::error!(
                intent_id = %intent.id,
                transaction_id = %transaction_id,
                error = %e,
                "Gateway intent created but transaction not stored; intent is orphaned"
            );
            return Err(payment_db_err(e));
        }

        tracing::info!(
            intent_id = %intent.id,
            transaction_id = %transaction_id,
            group_id = %group_id,
            amount_minor = request.amount_minor,
            "Payment intent created"
        );

        Ok(IntentCreated {
            intent_id: intent.id,
            client_secret: intent.client_secret,
            transaction_id,
        })
    }

    /// Applies a verified gateway event.
    ///
    /// Safe under at-least-once delivery: an event for a settled transaction
    /// changes nothing, and an event for an unknown intent is acknowledged.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the store transaction fails; the caller should
    /// answer non-2xx so the gateway retries.
    pub async fn handle_webhook_event(
        &self,
        event: &GatewayEvent,
    ) -> Result<WebhookOutcome, PaymentError> {
        let txn = self.db.begin().await.map_err(payment_db_err)?;

        let Some(transaction) = transactions::Entity::find()
            .filter(transactions::Column::GatewayIntentId.eq(event.intent_id.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(payment_db_err)?
        else {
            tracing::warn!(
                event_id = %event.id,
                intent_id = %event.intent_id,
                kind = event.kind.as_str(),
                "Webhook for unknown intent ignored"
            );
            return Ok(WebhookOutcome::UnknownIntent);
        };

        let transaction_id = transaction.id;
        let decision = ReconciliationService::decide(transaction.status.into(), event);
        let Some(target) = ReconciliationService::target_status(&decision) else {
            tracing::debug!(
                event_id = %event.id,
                intent_id = %event.intent_id,
                status = CoreTransactionStatus::from(transaction.status).as_str(),
                "Duplicate webhook delivery ignored"
            );
            return Ok(WebhookOutcome::Duplicate {
                transaction_id,
                status: transaction.status.into(),
            });
        };

        let mut active = transaction.clone().into_active_model();
        active.status = Set(target.into());
        active.updated_at = Set(Utc::now().into());
        match &decision {
            Reconciliation::Complete { charge_id } => {
                active.gateway_charge_id = Set(charge_id.clone());
            }
            Reconciliation::Fail { reason } => {
                active.failure_reason = Set(reason.clone());
            }
            Reconciliation::AlreadySettled { .. } => {}
        }

        let updated = transactions::Entity::update(active)
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending))
            .exec(&txn)
            .await;
        match updated {
            Ok(_) => {}
            Err(DbErr::RecordNotUpdated) => {
                tracing::debug!(
                    intent_id = %event.intent_id,
                    "Transaction settled concurrently; webhook ignored"
                );
                return Ok(WebhookOutcome::Duplicate {
                    transaction_id,
                    status: target,
                });
            }
            Err(e) => return Err(payment_db_err(e)),
        }

        if matches!(decision, Reconciliation::Complete { .. }) {
            self.settle_membership(&txn, &transaction, &event.intent_id)
                .await?;
        }

        txn.commit().await.map_err(payment_db_err)?;

        tracing::info!(
            intent_id = %event.intent_id,
            transaction_id = %transaction_id,
            status = target.as_str(),
            "Webhook applied"
        );

        Ok(WebhookOutcome::Applied {
            transaction_id,
            status: target,
        })
    }

    async fn settle_membership<C: ConnectionTrait>(
        &self,
        conn: &C,
        transaction: &transactions::Model,
        intent_id: &str,
    ) -> Result<(), PaymentError> {
        if let Some(group_id) = transaction.group_id {
            // Group first, then member, matching the membership lock order.
            let group = lock_group_by_id(conn, group_id)
                .await
                .map_err(payment_db_err)?;
            let member = lock_member(conn, group_id, transaction.user_id)
                .await
                .map_err(payment_db_err)?;

            match member {
                Some(member) => {
                    let status = CoreCommitmentStatus::from(member.commitment_status);
                    match MembershipService::payment_effect(status) {
                        PaymentEffect::MarkPaid => {
                            let mut active = member.into_active_model();
                            active.commitment_status = Set(CommitmentStatus::Paid);
                            active.payment_reference = Set(Some(intent_id.to_string()));
                            active.updated_at = Set(Utc::now().into());
                            active.update(conn).await.map_err(payment_db_err)?;
                        }
                        PaymentEffect::AlreadyPaid => {
                            tracing::debug!(
                                group_id = %group_id,
                                user_id = %transaction.user_id,
                                "Member already paid"
                            );
                        }
                        PaymentEffect::MemberWithdrawn => {
                            tracing::warn!(
                                group_id = %group_id,
                                user_id = %transaction.user_id,
                                intent_id = %intent_id,
                                "Payment completed for a withdrawn member"
                            );
                        }
                    }
                }
                None => {
                    tracing::warn!(
                        group_id = %group_id,
                        user_id = %transaction.user_id,
                        "Payment completed for a user with no membership"
                    );
                }
            }

            if group.is_some() {
                append_milestone(conn, MilestoneDraft::payment_received(group_id))
                    .await
                    .map_err(payment_db_err)?;
            }
        }

        let currency = Currency::from_str(&transaction.currency).unwrap_or(self.currency);
        let amount = Money::from_minor_units(transaction.amount, currency).amount;
        record_activity(
            conn,
            ActivityEntry {
                tenant_id: transaction.tenant_id,
                user_id: Some(transaction.user_id),
                action: ActivityAction::PaymentCompleted,
                entity_id: transaction.id,
                metadata: Some(json!({
                    "amount": amount,
                    "currency": currency.to_string(),
                    "paymentIntentId": intent_id,
                })),
            },
        )
        .await
        .map_err(payment_db_err)?;

        Ok(())
    }

    /// Returns a transaction owned by the caller, or any transaction in the
    /// caller's tenant for administrators.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` otherwise.
    pub async fn get_transaction(
        &self,
        identity: &Identity,
        transaction_id: Uuid,
    ) -> Result<transactions::Model, PaymentError> {
        let transaction = transactions::Entity::find_by_id(transaction_id)
            .one(&self.db)
            .await
            .map_err(payment_db_err)?
            .ok_or(PaymentError::TransactionNotFound(transaction_id))?;

        let visible = transaction.user_id == identity.user_id
            || (identity.role.is_admin()
                && AccessGuard::require_tenant(identity, transaction.tenant_id).is_ok());
        if !visible {
            return Err(PaymentError::TransactionNotFound(transaction_id));
        }
        Ok(transaction)
    }
}
