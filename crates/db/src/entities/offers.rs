//! `SeaORM` Entity for offers table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use groupbuy_core::negotiation::OfferSnapshot;

use super::sea_orm_active_enums::OfferType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub group_id: Uuid,
    pub offer_type: OfferType,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount_percent: Decimal,
    pub min_buyers: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub is_accepted: bool,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// The fields offer acceptance evaluates.
    #[must_use]
    pub fn snapshot(&self) -> OfferSnapshot {
        OfferSnapshot {
            id: self.id,
            group_id: self.group_id,
            discount_percent: self.discount_percent,
            is_accepted: self.is_accepted,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
