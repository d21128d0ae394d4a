//! Entity re-exports.

pub use super::activity_logs::Entity as ActivityLogs;
pub use super::group_members::Entity as GroupMembers;
pub use super::group_milestones::Entity as GroupMilestones;
pub use super::groups::Entity as Groups;
pub use super::offers::Entity as Offers;
pub use super::projects::Entity as Projects;
pub use super::tenants::Entity as Tenants;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
