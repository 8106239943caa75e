//! Storage layer for tmining.
//!
//! SQLite persistence behind a bounded connection pool, with the Repository
//! pattern for the `users` and `models` tables.

pub mod database;
pub mod error;
pub mod pool;
pub mod repositories;

pub use database::{Database, DatabaseLocation};
pub use error::{StorageError, StorageResult};
pub use pool::{ConnectionManager, PoolSettings, PoolStatistics, PooledConnection};
pub use repositories::{ModelRepository, SqliteModelRepository, SqliteUserRepository, UserRepository};
