/// API route handlers
///
/// Handlers extract the request, hand the caller's `AuthContext` to a
/// service, and map the result. No handler makes an authorization decision
/// of its own.

pub mod admin;
pub mod auth;
pub mod boards;
pub mod health;
pub mod invitations;
pub mod members;
pub mod projects;
pub mod users;

use serde::Deserialize;

/// `?version=` for versioned deletes
#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: i64,
}

/// `?limit=` for activity listings
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}
