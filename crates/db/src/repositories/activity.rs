//! Audit log entries.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, Set};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::entities::activity_logs;

/// Audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    /// A group was created.
    GroupCreated,
    /// A buyer joined a group.
    GroupJoin,
    /// A buyer withdrew from a group.
    GroupWithdraw,
    /// A payment settled.
    PaymentCompleted,
}

impl ActivityAction {
    /// Returns the stored action name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GroupCreated => "GROUP_CREATED",
            Self::GroupJoin => "GROUP_JOIN",
            Self::GroupWithdraw => "GROUP_WITHDRAW",
            Self::PaymentCompleted => "PAYMENT_COMPLETED",
        }
    }

    const fn entity_type(&self) -> &'static str {
        match self {
            Self::GroupCreated | Self::GroupJoin | Self::GroupWithdraw => "Group",
            Self::PaymentCompleted => "Transaction",
        }
    }
}

/// One audit log row.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    /// Tenant scope.
    pub tenant_id: Uuid,
    /// Acting user, if any.
    pub user_id: Option<Uuid>,
    /// What happened.
    pub action: ActivityAction,
    /// Group or transaction id.
    pub entity_id: Uuid,
    /// Extra detail.
    pub metadata: Option<Json>,
}

/// Writes an audit entry on the caller's connection or transaction.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn record_activity<C: ConnectionTrait>(
    conn: &C,
    entry: ActivityEntry,
) -> Result<activity_logs::Model, DbErr> {
    activity_logs::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(entry.tenant_id),
        user_id: Set(entry.user_id),
        action: Set(entry.action.as_str().to_string()),
        entity_type: Set(entry.action.entity_type().to_string()),
        entity_id: Set(entry.entity_id),
        metadata: Set(entry.metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
}
