//! Negotiation rules: recording and accepting developer offers.

pub mod service;

pub use service::{NegotiationService, OfferInput, OfferSnapshot};
