//! Group repository.
//!
//! Creation, reads, detail edits and the manual status transitions. Every
//! status change goes through [`GroupLifecycle`] and is persisted together
//! with its milestone.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use groupbuy_core::access::{AccessGuard, Capability, Identity, Role};
use groupbuy_core::group::{
    GroupAction, GroupChanges, GroupError, GroupLifecycle, GroupStatus as CoreGroupStatus,
    NewGroup,
};
use groupbuy_core::timeline::{MilestoneDraft, MilestoneType as CoreMilestoneType};

use crate::entities::{
    group_members, group_milestones, groups, offers, projects, sea_orm_active_enums::GroupStatus,
};

use super::activity::{ActivityAction, ActivityEntry, record_activity};
use super::timeline::{append_milestone, has_milestone, list_milestones};
use super::{commit_and_reject, group_db_err};

/// Filters for listing groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupFilter {
    /// Only groups for this project.
    pub project_id: Option<Uuid>,
    /// Only groups in this status.
    pub status: Option<CoreGroupStatus>,
}

/// A group with its members, offers and timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    /// The group row.
    #[serde(flatten)]
    pub group: groups::Model,
    /// Members, earliest join first.
    pub members: Vec<group_members::Model>,
    /// Offers, newest first.
    pub offers: Vec<offers::Model>,
    /// Milestones in creation order.
    pub milestones: Vec<group_milestones::Model>,
}

/// Loads an active group visible to the identity, without locking.
pub(crate) async fn find_group_in_scope<C: ConnectionTrait>(
    conn: &C,
    identity: &Identity,
    group_id: Uuid,
) -> Result<groups::Model, GroupError> {
    let group = groups::Entity::find_by_id(group_id)
        .one(conn)
        .await
        .map_err(group_db_err)?;
    check_scope(identity, group, group_id)
}

/// Loads an active group visible to the identity and locks its row until
/// the surrounding transaction ends.
pub(crate) async fn lock_group<C: ConnectionTrait>(
    conn: &C,
    identity: &Identity,
    group_id: Uuid,
) -> Result<groups::Model, GroupError> {
    let group = lock_group_by_id(conn, group_id)
        .await
        .map_err(group_db_err)?;
    check_scope(identity, group, group_id)
}

pub(crate) async fn lock_group_by_id<C: ConnectionTrait>(
    conn: &C,
    group_id: Uuid,
) -> Result<Option<groups::Model>, DbErr> {
    groups::Entity::find_by_id(group_id)
        .lock_exclusive()
        .one(conn)
        .await
}

fn check_scope(
    identity: &Identity,
    group: Option<groups::Model>,
    group_id: Uuid,
) -> Result<groups::Model, GroupError> {
    let group = group.ok_or(GroupError::GroupNotFound(group_id))?;
    AccessGuard::require_tenant(identity, group.tenant_id)
        .map_err(|e| GroupError::from_access(e, group_id))?;
    if !group.is_active {
        return Err(GroupError::GroupNotFound(group_id));
    }
    Ok(group)
}

/// Persists a validated status change and its milestone.
///
/// # Errors
///
/// Returns an error if either write fails.
pub(crate) async fn apply_action<C: ConnectionTrait>(
    conn: &C,
    group: groups::Model,
    action: &GroupAction,
) -> Result<groups::Model, DbErr> {
    let group_id = group.id;
    let mut active = group.into_active_model();
    active.status = Set(action.new_status().into());
    active.updated_at = Set(Utc::now().into());

    let draft = match action {
        GroupAction::StartNegotiation { started_at, .. } => {
            active.negotiation_start = Set(Some((*started_at).into()));
            MilestoneDraft::negotiation_started(group_id)
        }
        GroupAction::AcceptOffer {
            negotiated_discount,
            ..
        } => {
            active.negotiated_discount = Set(Some(*negotiated_discount));
            MilestoneDraft::offer_accepted(group_id, *negotiated_discount)
        }
        GroupAction::Close { .. } => MilestoneDraft::group_closed(group_id),
        GroupAction::Expire { .. } => MilestoneDraft::group_expired(group_id),
    };

    let updated = active.update(conn).await?;
    append_milestone(conn, draft).await?;

    tracing::info!(
        group_id = %group_id,
        status = %action.new_status(),
        "Group status changed"
    );

    Ok(updated)
}

/// Expires the group if its deadline has passed.
///
/// Returns the group as it stands afterwards.
///
/// # Errors
///
/// Returns an error if the expiry cannot be written.
pub(crate) async fn expire_if_overdue<C: ConnectionTrait>(
    conn: &C,
    group: groups::Model,
    now: DateTime<Utc>,
) -> Result<groups::Model, GroupError> {
    match GroupLifecycle::check_expiry(&group.snapshot(), now) {
        Some(action) => apply_action(conn, group, &action)
            .await
            .map_err(group_db_err),
        None => Ok(group),
    }
}

/// Repository for group operations.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    db: DatabaseConnection,
}

impl GroupRepository {
    /// Creates a new group repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an open group on a project in the caller's tenant.
    ///
    /// # Errors
    ///
    /// * `Forbidden` if the role cannot create groups
    /// * `Validation` for bad input
    /// * `ProjectNotFound` if the project is missing, inactive or foreign
    pub async fn create_group(
        &self,
        identity: &Identity,
        input: NewGroup,
    ) -> Result<groups::Model, GroupError> {
        AccessGuard::require(identity, Capability::GroupCreate)
            .map_err(|e| GroupError::Forbidden(e.to_string()))?;
        let now = Utc::now();
        input.validate(now)?;

        let project = projects::Entity::find_by_id(input.project_id)
            .one(&self.db)
            .await
            .map_err(group_db_err)?
            .filter(|p| p.is_active)
            .filter(|p| AccessGuard::require_tenant(identity, p.tenant_id).is_ok())
            .ok_or(GroupError::ProjectNotFound(input.project_id))?;

        let txn = self.db.begin().await.map_err(group_db_err)?;

        let group = groups::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(project.tenant_id),
            project_id: Set(project.id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            target_buyers_count: Set(input.target_buyers_count),
            current_buyers_count: Set(0),
            status: Set(GroupStatus::Open),
            negotiated_discount: Set(None),
            commitment_amount: Set(input.commitment_amount),
            deadline: Set(input.deadline.map(Into::into)),
            negotiation_start: Set(None),
            is_active: Set(true),
            created_by_id: Set(identity.user_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(group_db_err)?;

        append_milestone(
            &txn,
            MilestoneDraft::group_created(group.id, &identity.display_name_or("An organizer")),
        )
        .await
        .map_err(group_db_err)?;

        record_activity(
            &txn,
            ActivityEntry {
                tenant_id: group.tenant_id,
                user_id: Some(identity.user_id),
                action: ActivityAction::GroupCreated,
                entity_id: group.id,
                metadata: Some(json!({
                    "name": group.name,
                    "projectId": project.id,
                    "targetBuyersCount": group.target_buyers_count,
                })),
            },
        )
        .await
        .map_err(group_db_err)?;

        txn.commit().await.map_err(group_db_err)?;

        tracing::info!(
            group_id = %group.id,
            project_id = %project.id,
            created_by = %identity.user_id,
            "Group created"
        );

        Ok(group)
    }

    /// Lists active groups, newest first.
    ///
    /// Overdue groups in scope are expired first so the listed statuses are
    /// current.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the role cannot read groups.
    pub async fn list_groups(
        &self,
        identity: &Identity,
        filter: GroupFilter,
    ) -> Result<Vec<groups::Model>, GroupError> {
        AccessGuard::require(identity, Capability::GroupRead)
            .map_err(|e| GroupError::Forbidden(e.to_string()))?;

        let tenant = tenant_scope(identity);
        self.expire_overdue(tenant, Utc::now()).await?;

        let mut query = groups::Entity::find().filter(groups::Column::IsActive.eq(true));
        if let Some(tenant_id) = tenant {
            query = query.filter(groups::Column::TenantId.eq(tenant_id));
        }
        if let Some(project_id) = filter.project_id {
            query = query.filter(groups::Column::ProjectId.eq(project_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(groups::Column::Status.eq(GroupStatus::from(status)));
        }

        query
            .order_by_desc(groups::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(group_db_err)
    }

    /// Returns a group with members, offers and timeline.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` if the group is missing, inactive or foreign.
    pub async fn get_group_detail(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<GroupDetail, GroupError> {
        AccessGuard::require(identity, Capability::GroupRead)
            .map_err(|e| GroupError::from_access(e, group_id))?;

        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;
        let group = expire_if_overdue(&txn, group, Utc::now()).await?;
        txn.commit().await.map_err(group_db_err)?;

        let members = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id))
            .order_by_asc(group_members::Column::JoinedAt)
            .all(&self.db)
            .await
            .map_err(group_db_err)?;

        let offers = offers::Entity::find()
            .filter(offers::Column::GroupId.eq(group_id))
            .order_by_desc(offers::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(group_db_err)?;

        let milestones = list_milestones(&self.db, group_id)
            .await
            .map_err(group_db_err)?;

        Ok(GroupDetail {
            group,
            members,
            offers,
            milestones,
        })
    }

    /// Edits group details and optionally requests a status transition.
    ///
    /// # Errors
    ///
    /// * `GroupNotFound` / `Forbidden` if the caller cannot manage the group
    /// * `Validation` for bad or empty changes
    /// * `InvalidState` if the group is closed or expired
    /// * `InvalidTransition` for a status the state machine does not allow
    pub async fn update_group(
        &self,
        identity: &Identity,
        group_id: Uuid,
        changes: GroupChanges,
    ) -> Result<groups::Model, GroupError> {
        let now = Utc::now();
        if changes.is_empty() {
            return Err(GroupError::Validation("no changes supplied".to_string()));
        }
        changes.validate(now)?;

        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;
        if let Err(e) =
            AccessGuard::require_group_manager(identity, group.tenant_id, group.created_by_id)
        {
            return Err(GroupError::from_access(e, group_id));
        }

        let group = expire_if_overdue(&txn, group, now).await?;
        let status = CoreGroupStatus::from(group.status);
        if status.is_terminal() {
            return commit_and_reject(
                txn,
                GroupError::InvalidState {
                    operation: "update group",
                    status,
                },
            )
            .await;
        }

        let action = match changes.status {
            Some(requested) => match GroupLifecycle::request_status(status, requested, now) {
                Ok(action) => Some(action),
                Err(e) => return commit_and_reject(txn, e).await,
            },
            None => None,
        };

        let previous_target = group.target_buyers_count;
        let mut active = group.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(target) = changes.target_buyers_count {
            active.target_buyers_count = Set(target);
        }
        if let Some(amount) = changes.commitment_amount {
            active.commitment_amount = Set(Some(amount));
        }
        if let Some(deadline) = changes.deadline {
            active.deadline = Set(Some(deadline.into()));
        }
        active.updated_at = Set(now.into());
        let mut group = active.update(&txn).await.map_err(group_db_err)?;

        if group.target_buyers_count != previous_target {
            record_target_if_reached(&txn, &group).await?;
        }

        if let Some(action) = action {
            group = apply_action(&txn, group, &action)
                .await
                .map_err(group_db_err)?;
        }

        txn.commit().await.map_err(group_db_err)?;

        tracing::info!(group_id = %group_id, updated_by = %identity.user_id, "Group updated");
        Ok(group)
    }

    /// Moves an open group into negotiation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the group is open, plus the access
    /// errors of [`Self::update_group`].
    pub async fn start_negotiation(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<groups::Model, GroupError> {
        self.transition(identity, group_id, |status, now| {
            GroupLifecycle::start_negotiation(status, now)
        })
        .await
    }

    /// Closes a group whose offer has been accepted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the group is `OfferAccepted`.
    pub async fn close_group(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<groups::Model, GroupError> {
        self.transition(identity, group_id, |status, _| GroupLifecycle::close(status))
            .await
    }

    async fn transition<F>(
        &self,
        identity: &Identity,
        group_id: Uuid,
        decide: F,
    ) -> Result<groups::Model, GroupError>
    where
        F: FnOnce(CoreGroupStatus, DateTime<Utc>) -> Result<GroupAction, GroupError>,
    {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;
        AccessGuard::require_group_manager(identity, group.tenant_id, group.created_by_id)
            .map_err(|e| GroupError::from_access(e, group_id))?;

        let group = expire_if_overdue(&txn, group, now).await?;
        let action = match decide(group.status.into(), now) {
            Ok(action) => action,
            Err(e) => return commit_and_reject(txn, e).await,
        };

        let group = apply_action(&txn, group, &action)
            .await
            .map_err(group_db_err)?;
        txn.commit().await.map_err(group_db_err)?;
        Ok(group)
    }

    /// Soft-deletes a group.
    ///
    /// # Errors
    ///
    /// * `Forbidden` unless the caller is an administrator
    /// * `GroupNotFound` if the group is missing, already inactive or foreign
    pub async fn deactivate_group(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<(), GroupError> {
        AccessGuard::require(identity, Capability::GroupDelete)
            .map_err(|e| GroupError::from_access(e, group_id))?;

        let txn = self.db.begin().await.map_err(group_db_err)?;
        let group = lock_group(&txn, identity, group_id).await?;

        let mut active = group.into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(group_db_err)?;
        txn.commit().await.map_err(group_db_err)?;

        tracing::info!(group_id = %group_id, deactivated_by = %identity.user_id, "Group deactivated");
        Ok(())
    }

    /// Expires every overdue group, optionally within one tenant.
    ///
    /// Each group is expired in its own transaction under its row lock, so a
    /// concurrent join either sees the expiry or completes before it.
    ///
    /// # Errors
    ///
    /// Returns `Database` if a query fails.
    pub async fn expire_overdue(
        &self,
        tenant_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<u64, GroupError> {
        let mut condition = Condition::all()
            .add(groups::Column::IsActive.eq(true))
            .add(
                Condition::any()
                    .add(groups::Column::Status.eq(GroupStatus::Open))
                    .add(groups::Column::Status.eq(GroupStatus::Negotiating)),
            )
            .add(groups::Column::Deadline.lte(now));
        if let Some(tenant_id) = tenant_id {
            condition = condition.add(groups::Column::TenantId.eq(tenant_id));
        }

        let candidates: Vec<Uuid> = groups::Entity::find()
            .select_only()
            .column(groups::Column::Id)
            .filter(condition)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(group_db_err)?;

        let mut expired = 0;
        for group_id in candidates {
            let txn = self.db.begin().await.map_err(group_db_err)?;
            let Some(group) = lock_group_by_id(&txn, group_id)
                .await
                .map_err(group_db_err)?
            else {
                continue;
            };
            let before = group.status;
            let after = expire_if_overdue(&txn, group, now).await?;
            txn.commit().await.map_err(group_db_err)?;
            if after.status != before {
                expired += 1;
            }
        }

        if expired > 0 {
            tracing::info!(count = expired, "Expired overdue groups");
        }
        Ok(expired)
    }
}

/// Appends `TARGET_REACHED` if the count meets the target and the group has
/// not recorded it yet.
pub(crate) async fn record_target_if_reached<C: ConnectionTrait>(
    conn: &C,
    group: &groups::Model,
) -> Result<(), GroupError> {
    if group.current_buyers_count < group.target_buyers_count {
        return Ok(());
    }
    if has_milestone(conn, group.id, CoreMilestoneType::TargetReached)
        .await
        .map_err(group_db_err)?
    {
        return Ok(());
    }
    append_milestone(
        conn,
        MilestoneDraft::target_reached(group.id, group.target_buyers_count),
    )
    .await
    .map_err(group_db_err)?;
    tracing::info!(
        group_id = %group.id,
        target = group.target_buyers_count,
        "Group reached its buyer target"
    );
    Ok(())
}

fn tenant_scope(identity: &Identity) -> Option<Uuid> {
    (identity.role != Role::SuperAdmin).then_some(identity.tenant_id)
}
