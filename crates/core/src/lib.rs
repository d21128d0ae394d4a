//! Core business logic for Groupbuy.
//!
//! This crate contains the group commitment and payment reconciliation rules
//! with ZERO database or web framework dependencies. Every rule is expressed
//! as a pure decision over a snapshot of stored state; the db crate applies
//! the decisions inside a single transaction.
//!
//! # Modules
//!
//! - `access` - Roles, capabilities and the access guard
//! - `group` - Group status machine and shared domain types
//! - `membership` - Join, withdraw and commit rules
//! - `negotiation` - Offer recording and acceptance rules
//! - `timeline` - Milestone drafts for the append-only group timeline
//! - `payment` - Payment intents, gateway client and webhook reconciliation

pub mod access;
pub mod group;
pub mod membership;
pub mod negotiation;
pub mod payment;
pub mod timeline;
