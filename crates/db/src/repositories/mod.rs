//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every mutating method runs in one database transaction holding a row lock
//! on the affected group, so counts, statuses and milestones move together.

pub mod activity;
pub mod group;
pub mod membership;
pub mod negotiation;
pub mod payment;
pub mod timeline;

pub use activity::{ActivityAction, ActivityEntry};
pub use group::{GroupDetail, GroupFilter, GroupRepository};
pub use membership::MembershipRepository;
pub use negotiation::{AcceptedOffer, NegotiationRepository};
pub use payment::{IntentCreated, PaymentRepository, WebhookOutcome};
pub use timeline::TimelineRepository;

use sea_orm::{DatabaseTransaction, DbErr, SqlErr, TransactionTrait};

use groupbuy_core::group::GroupError;
use groupbuy_core::payment::PaymentError;

pub(crate) fn group_db_err(err: DbErr) -> GroupError {
    GroupError::Database(err.to_string())
}

pub(crate) fn payment_db_err(err: DbErr) -> PaymentError {
    PaymentError::Database(err.to_string())
}

/// Returns true if the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Commits writes already made (such as a lazy expiry) and returns `err`.
pub(crate) async fn commit_and_reject<T>(
    txn: DatabaseTransaction,
    err: GroupError,
) -> Result<T, GroupError> {
    txn.commit().await.map_err(group_db_err)?;
    Err(err)
}
