//! Request middleware.

pub mod auth;

pub use auth::{AuthRejection, AuthUser, auth_middleware};
