//! Multi-user registry of users and model metadata.
//!
//! Every operation checks a connection out of the pool, runs as one
//! transaction and commits before returning. The registry is a cheap handle;
//! clones share the same pool.

mod models;
pub mod resolution;
mod users;

use crate::storage::{ConnectionManager, StorageResult};

pub use resolution::{resolve_name, NameResolution, ResolvedName};

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    pool: ConnectionManager,
}

impl ModelRegistry {
    pub fn new(pool: ConnectionManager) -> Self {
        Self { pool }
    }

    /// Registry over a private in-memory database.
    pub fn in_memory() -> StorageResult<Self> {
        Ok(Self::new(ConnectionManager::in_memory()?))
    }

    pub fn pool(&self) -> &ConnectionManager {
        &self.pool
    }
}
