//! Access guard for group operations.
//!
//! Roles map to a fixed capability set. The guard is evaluated once at the
//! boundary and again by services that can be invoked directly, so an
//! unauthorized caller is rejected even when it bypasses the HTTP layer.

pub mod error;
pub mod guard;
pub mod role;

pub use error::AccessError;
pub use guard::{AccessGuard, Identity};
pub use role::{Capability, Role};
