//! # CollabHub Shared Library
//!
//! Domain types, persistence, and the project collaboration services used by
//! the CollabHub API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, projects, memberships, invitations, notices, activity
//! - `auth`: Identity resolution, project authorization, JWT, passwords
//! - `db`: The `Store` abstraction with PostgreSQL and in-memory backends
//! - `notify`: Invitation delivery
//! - `services`: Operations that authorize, mutate and commit
//! - `error`: The domain error type

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;

/// Current version of the CollabHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
