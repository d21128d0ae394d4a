//! Membership rules: join, withdraw, commit and the payment effect.
//!
//! These functions decide; the store applies. Each returns a plan carrying
//! the new buyer count so the caller can write the member row, the count and
//! the milestone in one transaction while holding the group row lock.

pub mod service;

#[cfg(test)]
mod service_props;

pub use service::{JoinPlan, MembershipService, PaymentEffect, WithdrawPlan};
