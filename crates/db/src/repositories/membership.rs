//! Membership repository.
//!
//! Join, withdraw and commit each run in one transaction that locks the
//! group row first, then the member row, so `current_buyers_count` always
//! equals the number of non-withdrawn members.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use groupbuy_core::access::{AccessGuard, Capability, Identity};
use groupbuy_core::group::{CommitmentStatus as CoreCommitmentStatus, GroupError};
use groupbuy_core::membership::MembershipService;
use groupbuy_core::timeline::MilestoneDraft;

use crate::entities::{group_members, groups, sea_orm_active_enums::CommitmentStatus};

use super::activity::{ActivityAction, ActivityEntry, record_activity};
use super::group::{expire_if_overdue, find_group_in_scope, lock_group, record_target_if_reached};
use super::timeline::append_milestone;
use super::{commit_and_reject, group_db_err, is_unique_violation};

/// Loads and locks a user's membership row.
pub(crate) async fn lock_member<C: ConnectionTrait>(
    conn: &C,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<Option<group_members::Model>, sea_orm::DbErr> {
    group_members::Entity::find()
        .filter(group_members::Column::GroupId.eq(group_id))
        .filter(group_members::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(conn)
        .await
}

/// Repository for group membership.
#[derive(Debug, Clone)]
pub struct MembershipRepository {
    db: DatabaseConnection,
}

impl MembershipRepository {
    /// Creates a new membership repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Joins the caller to an open group.
    ///
    /// Creates an `INTERESTED` membership, increments the buyer count and
    /// appends `MEMBER_JOINED` (plus `TARGET_REACHED` the first time the
    /// target is met) in one transaction.
    ///
    /// # Errors
    ///
    /// * `Forbidden` if the role cannot join
    /// * `GroupNotFound` if the group is missing, inactive or foreign
    /// * `InvalidState` unless the group is open
    /// * `AlreadyMember` if the caller holds any membership in the group
    pub async fn join(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<group_members::Model, GroupError> {
        AccessGuard::require(identity, Capability::GroupJoin)
            .map_err(|e| GroupError::from_access(e, group_id))?;

        let now = Utc::now();
        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;
        let group = expire_if_overdue(&txn, group, now).await?;

        let existing = lock_member(&txn, group_id, identity.user_id)
            .await
            .map_err(group_db_err)?
            .map(|m| CoreCommitmentStatus::from(m.commitment_status));

        let plan = match MembershipService::join(&group.snapshot(), identity.user_id, existing) {
            Ok(plan) => plan,
            Err(e) => return commit_and_reject(txn, e).await,
        };

        let member = group_members::ActiveModel {
            id: Set(Uuid::new_v4()),
            group_id: Set(group_id),
            user_id: Set(identity.user_id),
            commitment_status: Set(CommitmentStatus::Interested),
            payment_reference: Set(None),
            joined_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GroupError::AlreadyMember {
                    group_id,
                    user_id: identity.user_id,
                }
            } else {
                group_db_err(e)
            }
        })?;

        let group = set_count(&txn, group, plan.new_count).await?;

        append_milestone(
            &txn,
            MilestoneDraft::member_joined(group_id, &identity.display_name_or("A buyer")),
        )
        .await
        .map_err(group_db_err)?;

        if plan.target_reached {
            record_target_if_reached(&txn, &group).await?;
        }

        record_activity(
            &txn,
            ActivityEntry {
                tenant_id: group.tenant_id,
                user_id: Some(identity.user_id),
                action: ActivityAction::GroupJoin,
                entity_id: group_id,
                metadata: Some(json!({ "groupName": group.name })),
            },
        )
        .await
        .map_err(group_db_err)?;

        txn.commit().await.map_err(group_db_err)?;

        tracing::info!(
            group_id = %group_id,
            user_id = %identity.user_id,
            count = plan.new_count,
            "Buyer joined group"
        );

        Ok(member)
    }

    /// Withdraws the caller from a group.
    ///
    /// # Errors
    ///
    /// * `GroupNotFound` if the group is missing, inactive or foreign
    /// * `InvalidState` if the group is closed or expired
    /// * `MemberNotFound` if the caller never joined
    /// * `InvalidMemberState` if the caller has paid or already withdrew
    pub async fn withdraw(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<group_members::Model, GroupError> {
        AccessGuard::require(identity, Capability::GroupJoin)
            .map_err(|e| GroupError::from_access(e, group_id))?;

        let now = Utc::now();
        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;
        let group = expire_if_overdue(&txn, group, now).await?;

        let member = lock_member(&txn, group_id, identity.user_id)
            .await
            .map_err(group_db_err)?;
        let existing = member
            .as_ref()
            .map(|m| CoreCommitmentStatus::from(m.commitment_status));

        let plan = match MembershipService::withdraw(&group.snapshot(), identity.user_id, existing)
        {
            Ok(plan) => plan,
            Err(e) => return commit_and_reject(txn, e).await,
        };
        let Some(member) = member else {
            return commit_and_reject(
                txn,
                GroupError::MemberNotFound {
                    group_id,
                    user_id: identity.user_id,
                },
            )
            .await;
        };

        let member = set_member_status(&txn, member, CommitmentStatus::Withdrawn).await?;
        let group = set_count(&txn, group, plan.new_count).await?;

        append_milestone(
            &txn,
            MilestoneDraft::member_withdrawn(group_id, &identity.display_name_or("A buyer")),
        )
        .await
        .map_err(group_db_err)?;

        record_activity(
            &txn,
            ActivityEntry {
                tenant_id: group.tenant_id,
                user_id: Some(identity.user_id),
                action: ActivityAction::GroupWithdraw,
                entity_id: group_id,
                metadata: Some(json!({ "previousStatus": plan.previous_status.as_str() })),
            },
        )
        .await
        .map_err(group_db_err)?;

        txn.commit().await.map_err(group_db_err)?;

        tracing::info!(
            group_id = %group_id,
            user_id = %identity.user_id,
            count = plan.new_count,
            "Buyer withdrew from group"
        );

        Ok(member)
    }

    /// Moves the caller's membership from `INTERESTED` to `COMMITTED`.
    ///
    /// # Errors
    ///
    /// As for [`Self::withdraw`], with `InvalidMemberState` unless the
    /// caller is `INTERESTED`.
    pub async fn commit(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<group_members::Model, GroupError> {
        AccessGuard::require(identity, Capability::GroupJoin)
            .map_err(|e| GroupError::from_access(e, group_id))?;

        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;
        let group = expire_if_overdue(&txn, group, Utc::now()).await?;

        let member = lock_member(&txn, group_id, identity.user_id)
            .await
            .map_err(group_db_err)?;
        let existing = member
            .as_ref()
            .map(|m| CoreCommitmentStatus::from(m.commitment_status));

        let next = match MembershipService::commit(&group.snapshot(), identity.user_id, existing) {
            Ok(next) => next,
            Err(e) => return commit_and_reject(txn, e).await,
        };
        let Some(member) = member else {
            return commit_and_reject(
                txn,
                GroupError::MemberNotFound {
                    group_id,
                    user_id: identity.user_id,
                },
            )
            .await;
        };

        let member = set_member_status(&txn, member, next.into()).await?;
        append_milestone(
            &txn,
            MilestoneDraft::member_committed(group_id, &identity.display_name_or("A buyer")),
        )
        .await
        .map_err(group_db_err)?;

        txn.commit().await.map_err(group_db_err)?;

        tracing::info!(group_id = %group_id, user_id = %identity.user_id, "Buyer committed");
        Ok(member)
    }

    /// Lists a group's members, earliest join first.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for groups outside the caller's tenant.
    pub async fn list_members(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<Vec<group_members::Model>, GroupError> {
        AccessGuard::require(identity, Capability::GroupRead)
            .map_err(|e| GroupError::from_access(e, group_id))?;
        find_group_in_scope(&self.db, identity, group_id).await?;

        group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id))
            .order_by_asc(group_members::Column::JoinedAt)
            .all(&self.db)
            .await
            .map_err(group_db_err)
    }
}

async fn set_count<C: ConnectionTrait>(
    conn: &C,
    group: groups::Model,
    count: i32,
) -> Result<groups::Model, GroupError> {
    let mut active = group.into_active_model();
    active.current_buyers_count = Set(count);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await.map_err(group_db_err)
}

async fn set_member_status<C: ConnectionTrait>(
    conn: &C,
    member: group_members::Model,
    status: CommitmentStatus,
) -> Result<group_members::Model, GroupError> {
    let mut active = member.into_active_model();
    active.commitment_status = Set(status);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await.map_err(group_db_err)
}
