//! Group lifecycle for collective purchases.
//!
//! A group moves `OPEN → NEGOTIATING → OFFER_ACCEPTED → CLOSED`, and may
//! expire from `OPEN` or `NEGOTIATING` once its deadline passes.
//!
//! # Modules
//!
//! - `types` - Group status, commitment status, snapshots and inputs
//! - `error` - Errors shared by the group, membership and negotiation flows
//! - `lifecycle` - State machine transitions

pub mod error;
pub mod lifecycle;
pub mod types;

#[cfg(test)]
mod lifecycle_props;

pub use error::GroupError;
pub use lifecycle::{GroupAction, GroupLifecycle};
pub use types::{
    CommitmentStatus, GroupChanges, GroupSnapshot, GroupStatus, NewGroup, OfferType,
};
