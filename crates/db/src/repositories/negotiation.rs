//! Negotiation repository.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use groupbuy_core::access::{AccessGuard, Capability, Identity};
use groupbuy_core::group::GroupError;
use groupbuy_core::negotiation::{NegotiationService, OfferInput};
use groupbuy_core::timeline::MilestoneDraft;

use crate::entities::{groups, offers};

use super::group::{apply_action, expire_if_overdue, find_group_in_scope, lock_group};
use super::timeline::append_milestone;
use super::{commit_and_reject, group_db_err, is_unique_violation};

/// Result of accepting an offer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedOffer {
    /// The group after the transition.
    pub group: groups::Model,
    /// The accepted offer.
    pub offer: offers::Model,
}

/// Repository for developer offers.
#[derive(Debug, Clone)]
pub struct NegotiationRepository {
    db: DatabaseConnection,
}

impl NegotiationRepository {
    /// Creates a new negotiation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a developer offer on a negotiating group.
    ///
    /// # Errors
    ///
    /// * `GroupNotFound` / `Forbidden` if the caller cannot manage the group
    /// * `Validation` for bad offer terms
    /// * `InvalidState` unless the group is negotiating
    pub async fn record_offer(
        &self,
        identity: &Identity,
        group_id: Uuid,
        input: OfferInput,
    ) -> Result<offers::Model, GroupError> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;
        let group = expire_if_overdue(&txn, group, now).await?;

        if let Err(e) = NegotiationService::record_offer(identity, &group.snapshot(), &input) {
            return commit_and_reject(txn, e).await;
        }

        let offer = offers::ActiveModel {
            id: Set(Uuid::new_v4()),
            group_id: Set(group_id),
            offer_type: Set(input.offer_type.into()),
            discount_percent: Set(input.discount_percent),
            min_buyers: Set(input.min_buyers),
            notes: Set(input.notes),
            is_accepted: Set(false),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(group_db_err)?;

        append_milestone(
            &txn,
            MilestoneDraft::offer_received(group_id, offer.discount_percent),
        )
        .await
        .map_err(group_db_err)?;

        txn.commit().await.map_err(group_db_err)?;

        tracing::info!(
            group_id = %group_id,
            offer_id = %offer.id,
            discount = %offer.discount_percent,
            "Offer recorded"
        );

        Ok(offer)
    }

    /// Accepts an offer, moving the group to `OFFER_ACCEPTED`.
    ///
    /// All other offers on the group are left unaccepted; the
    /// `uq_offers_one_accepted` index backs this up.
    ///
    /// # Errors
    ///
    /// * `GroupNotFound` / `Forbidden` if the caller cannot manage the group
    /// * `OfferNotFound` if the offer does not exist
    /// * `InvalidState` if the offer belongs to another group or the group
    ///   is not negotiating
    /// * `OfferAlreadyAccepted` if the group already accepted an offer
    pub async fn accept_offer(
        &self,
        identity: &Identity,
        group_id: Uuid,
        offer_id: Uuid,
    ) -> Result<AcceptedOffer, GroupError> {
        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;
        let group = expire_if_overdue(&txn, group, Utc::now()).await?;

        let Some(offer) = offers::Entity::find_by_id(offer_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(group_db_err)?
        else {
            return commit_and_reject(txn, GroupError::OfferNotFound(offer_id)).await;
        };

        let accepted_count = offers::Entity::find()
            .filter(offers::Column::GroupId.eq(group_id))
            .filter(offers::Column::IsAccepted.eq(true))
            .count(&txn)
            .await
            .map_err(group_db_err)?;

        let action = match NegotiationService::accept_offer(
            identity,
            &group.snapshot(),
            &offer.snapshot(),
            accepted_count > 0,
        ) {
            Ok(action) => action,
            Err(e) => return commit_and_reject(txn, e).await,
        };

        offers::Entity::update_many()
            .col_expr(offers::Column::IsAccepted, Expr::value(false))
            .filter(offers::Column::GroupId.eq(group_id))
            .filter(offers::Column::Id.ne(offer_id))
            .exec(&txn)
            .await
            .map_err(group_db_err)?;

        let mut active = offer.into_active_model();
        active.is_accepted = Set(true);
        let offer = active.update(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                GroupError::OfferAlreadyAccepted(group_id)
            } else {
                group_db_err(e)
            }
        })?;

        let group = apply_action(&txn, group, &action)
            .await
            .map_err(group_db_err)?;

        txn.commit().await.map_err(group_db_err)?;

        tracing::info!(
            group_id = %group_id,
            offer_id = %offer_id,
            discount = %offer.discount_percent,
            "Offer accepted"
        );

        Ok(AcceptedOffer { group, offer })
    }

    /// Lists a group's offers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for groups outside the caller's tenant.
    pub async fn list_offers(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<Vec<offers::Model>, GroupError> {
        AccessGuard::require(identity, Capability::GroupRead)
            .map_err(|e| GroupError::from_access(e, group_id))?;
        find_group_in_scope(&self.db, identity, group_id).await?;

        offers::Entity::find()
            .filter(offers::Column::GroupId.eq(group_id))
            .order_by_desc(offers::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(group_db_err)
    }
}
