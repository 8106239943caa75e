//! Database connection and schema management.

use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::storage::error::StorageResult;

/// Where a pool's connections point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite file on disk.
    File(PathBuf),
    /// Shared-cache in-memory database; every connection opened with the same
    /// name sees the same data while at least one of them stays open.
    Memory { name: String },
}

impl DatabaseLocation {
    /// A fresh in-memory database no other pool can reach.
    pub fn unique_memory() -> Self {
        Self::Memory { name: format!("tmining-{}", Uuid::new_v4()) }
    }
}

impl std::fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory { name } => write!(f, "memory:{name}"),
        }
    }
}

/// Database connection wrapper.
///
/// Every connection has foreign keys enforced and a busy timeout so that
/// writers on other connections are waited for instead of failing outright.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a connection without touching the schema.
    ///
    /// # Errors
    /// * `StorageError::Connection` - If the database cannot be opened or configured
    pub fn open(location: &DatabaseLocation, busy_timeout: Duration) -> StorageResult<Self> {
        let conn = match location {
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let conn = Connection::open(path)?;
                conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
                conn
            }
            DatabaseLocation::Memory { name } => Connection::open_with_flags(
                format!("file:{name}?mode=memory&cache=shared"),
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
        };

        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        debug!(location = %location, "Opened database connection");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database with the schema in place.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Gets a reference to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Creates the registry tables if they are missing.
    pub fn init_schema(&self) -> StorageResult<()> {
        info!("Initializing database schema");

        self.conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS users (
                sub TEXT PRIMARY KEY,
                uuid TEXT NOT NULL UNIQUE,
                token TEXT,
                auth_info TEXT
            );

            CREATE TABLE IF NOT EXISTS models (
                name TEXT NOT NULL,
                uuid TEXT PRIMARY KEY,
                shared INTEGER NOT NULL,
                user_uuid TEXT NOT NULL REFERENCES users(uuid)
            );

            CREATE INDEX IF NOT EXISTS idx_models_user_uuid ON models(user_uuid);
            ",
        )?;

        Ok(())
    }

    /// Runs `f` inside an immediate transaction, committing on `Ok` and
    /// rolling back on `Err`.
    ///
    /// The write lock is taken up front so a read-then-write sequence cannot
    /// deadlock against another connection doing the same.
    pub fn transaction<F, R>(&mut self, f: F) -> StorageResult<R>
    where
        F: FnOnce(&rusqlite::Transaction) -> StorageResult<R>,
    {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                tx.rollback()?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'models')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        db.init_schema().unwrap();
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = Database::open_in_memory().unwrap();
        let result = db.conn().execute(
            "INSERT INTO models (name, uuid, shared, user_uuid) VALUES ('m', 'm-1', 0, 'nobody')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut db = Database::open_in_memory().unwrap();
        let result: StorageResult<()> = db.transaction(|tx| {
            tx.execute("INSERT INTO users (sub, uuid) VALUES ('alice', 'u-1')", [])?;
            Err(crate::storage::StorageError::UnknownUser("forced".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db.conn().query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_shared_memory_connections_see_each_other() {
        let location = DatabaseLocation::unique_memory();
        let first = Database::open(&location, Duration::from_millis(100)).unwrap();
        first.init_schema().unwrap();
        first.conn().execute("INSERT INTO users (sub, uuid) VALUES ('alice', 'u-1')", []).unwrap();

        let second = Database::open(&location, Duration::from_millis(100)).unwrap();
        let count: i64 = second.conn().query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
