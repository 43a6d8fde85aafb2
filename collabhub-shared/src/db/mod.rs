/// Persistence
///
/// # Modules
///
/// - `store`: the [`Store`](store::Store) / [`UnitOfWork`](store::UnitOfWork) traits
/// - `memory`: in-process backend for tests and database-less development
/// - `postgres`: sqlx-backed Postgres backend
/// - `pool`: connection pool creation and health checks
/// - `migrations`: embedded schema migrations

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod store;
