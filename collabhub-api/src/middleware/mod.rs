/// Middleware for the API server
///
/// - `auth`: Bearer token authentication

pub mod auth;
