//! `SeaORM` entity definitions.

pub mod prelude;

pub mod activity_logs;
pub mod group_members;
pub mod group_milestones;
pub mod groups;
pub mod offers;
pub mod projects;
pub mod sea_orm_active_enums;
pub mod tenants;
pub mod transactions;
pub mod users;
