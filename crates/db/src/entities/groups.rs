//! `SeaORM` Entity for groups table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use groupbuy_core::group::GroupSnapshot;

use super::sea_orm_active_enums::GroupStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub target_buyers_count: i32,
    pub current_buyers_count: i32,
    pub status: GroupStatus,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub negotiated_discount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))", nullable)]
    pub commitment_amount: Option<Decimal>,
    pub deadline: Option<DateTimeWithTimeZone>,
    pub negotiation_start: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    pub created_by_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// The fields the core rules evaluate.
    #[must_use]
    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            id: self.id,
            tenant_id: self.tenant_id,
            status: self.status.into(),
            is_active: self.is_active,
            target_buyers_count: self.target_buyers_count,
            current_buyers_count: self.current_buyers_count,
            deadline: self.deadline.map(|d| d.to_utc()),
            created_by_id: self.created_by_id,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenants::Entity",
        from = "Column::TenantId",
        to = "super::tenants::Column::Id"
    )]
    Tenants,
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id"
    )]
    Projects,
    #[sea_orm(has_many = "super::group_members::Entity")]
    GroupMembers,
    #[sea_orm(has_many = "super::offers::Entity")]
    Offers,
    #[sea_orm(has_many = "super::group_milestones::Entity")]
    GroupMilestones,
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenants.def()
    }
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMembers.def()
    }
}

impl Related<super::offers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offers.def()
    }
}

impl Related<super::group_milestones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMilestones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
