//! Timeline recorder.
//!
//! Milestones are appended on the same connection as the change they
//! describe, and read back in creation order.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use groupbuy_core::access::{AccessGuard, Capability, Identity};
use groupbuy_core::group::GroupError;
use groupbuy_core::timeline::{MilestoneDraft, MilestoneType as CoreMilestoneType};

use crate::entities::{group_milestones, sea_orm_active_enums::MilestoneType};

use super::group::find_group_in_scope;
use super::group_db_err;

/// Appends a milestone.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn append_milestone<C: ConnectionTrait>(
    conn: &C,
    draft: MilestoneDraft,
) -> Result<group_milestones::Model, DbErr> {
    tracing::debug!(
        group_id = %draft.group_id,
        milestone = %draft.milestone_type,
        "Appending milestone"
    );

    group_milestones::ActiveModel {
        id: Set(Uuid::new_v4()),
        group_id: Set(draft.group_id),
        milestone_type: Set(draft.milestone_type.into()),
        title: Set(draft.title),
        description: Set(draft.description),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

/// Returns true if the group already has a milestone of this type.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn has_milestone<C: ConnectionTrait>(
    conn: &C,
    group_id: Uuid,
    milestone_type: CoreMilestoneType,
) -> Result<bool, DbErr> {
    let count = group_milestones::Entity::find()
        .filter(group_milestones::Column::GroupId.eq(group_id))
        .filter(group_milestones::Column::MilestoneType.eq(MilestoneType::from(milestone_type)))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Lists milestones in creation order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_milestones<C: ConnectionTrait>(
    conn: &C,
    group_id: Uuid,
) -> Result<Vec<group_milestones::Model>, DbErr> {
    group_milestones::Entity::find()
        .filter(group_milestones::Column::GroupId.eq(group_id))
        .order_by_asc(group_milestones::Column::Seq)
        .all(conn)
        .await
}

/// Read access to group timelines.
#[derive(Debug, Clone)]
pub struct TimelineRepository {
    db: DatabaseConnection,
}

impl TimelineRepository {
    /// Creates a new timeline repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns a group's milestones in creation order.
    ///
    /// # Errors
    ///
    /// Returns `GroupNotFound` for groups outside the caller's tenant.
    pub async fn list(
        &self,
        identity: &Identity,
        group_id: Uuid,
    ) -> Result<Vec<group_milestones::Model>, GroupError> {
        AccessGuard::require(identity, Capability::GroupRead)
            .map_err(|e| GroupError::from_access(e, group_id))?;
        find_group_in_scope(&self.db, identity, group_id).await?;
        list_milestones(&self.db, group_id)
            .await
            .map_err(group_db_err)
    }
}
