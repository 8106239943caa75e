//! Bounded checkout/checkin pool of SQLite connections.
//!
//! A connection is only ever held by one checkout at a time. Connections are
//! opened lazily up to `max_connections`; past that, `acquire` waits for a
//! checkin until `acquire_timeout` runs out.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::storage::database::{Database, DatabaseLocation};
use crate::storage::error::{StorageError, StorageResult};

/// How a [`ConnectionManager`] opens and bounds its connections.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub location: DatabaseLocation,
    pub max_connections: usize,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
}

impl PoolSettings {
    pub fn new(location: DatabaseLocation) -> Self {
        Self {
            location,
            max_connections: 4,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

#[derive(Default)]
struct PoolState {
    idle: Vec<Database>,
    open: usize,
}

struct PoolInner {
    settings: PoolSettings,
    state: Mutex<PoolState>,
    available: Condvar,
    schema_ready: Mutex<bool>,
}

/// Shared handle to the pool. Clones refer to the same connections.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("settings", &self.inner.settings)
            .field("stats", &self.statistics())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(settings: PoolSettings) -> StorageResult<Self> {
        if settings.max_connections == 0 {
            return Err(StorageError::invalid("max_connections", "pool needs at least one connection"));
        }
        info!(
            location = %settings.location,
            max_connections = settings.max_connections,
            "Creating connection pool"
        );
        Ok(Self {
            inner: Arc::new(PoolInner {
                settings,
                state: Mutex::new(PoolState::default()),
                available: Condvar::new(),
                schema_ready: Mutex::new(false),
            }),
        })
    }

    /// Pool over a fresh shared-cache in-memory database.
    pub fn in_memory() -> StorageResult<Self> {
        Self::new(PoolSettings::new(DatabaseLocation::unique_memory()))
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.inner.settings
    }

    /// Check out a connection, opening one if the pool is below its bound.
    ///
    /// The first connection a manager opens creates the schema. An in-memory
    /// database is gone once its last connection closes, so the schema is
    /// created again on the next open.
    ///
    /// # Errors
    /// * `StorageError::PoolTimeout` - If no connection was checked in in time
    /// * `StorageError::Connection` - If a new connection could not be opened
    pub fn acquire(&self) -> StorageResult<PooledConnection> {
        let settings = &self.inner.settings;
        let started = Instant::now();
        let deadline = started + settings.acquire_timeout;
        let mut state = self.lock_state();

        loop {
            if let Some(db) = state.idle.pop() {
                return Ok(PooledConnection::new(db, self.clone()));
            }

            if state.open < settings.max_connections {
                state.open += 1;
                drop(state);
                return match self.open_connection() {
                    Ok(db) => Ok(PooledConnection::new(db, self.clone())),
                    Err(e) => {
                        self.forget_connection();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    waited_ms = started.elapsed().as_millis() as u64,
                    max_connections = settings.max_connections,
                    "Connection pool exhausted"
                );
                return Err(StorageError::PoolTimeout { waited: started.elapsed() });
            }
            state = self
                .inner
                .available
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Current pool usage.
    pub fn statistics(&self) -> PoolStatistics {
        let state = self.lock_state();
        PoolStatistics {
            idle_connections: state.idle.len(),
            open_connections: state.open,
            max_connections: self.inner.settings.max_connections,
        }
    }

    fn open_connection(&self) -> StorageResult<Database> {
        let settings = &self.inner.settings;
        let db = Database::open(&settings.location, settings.busy_timeout)?;

        let mut ready = self.inner.schema_ready.lock().unwrap_or_else(PoisonError::into_inner);
        if !*ready {
            db.init_schema()?;
            *ready = true;
        }
        drop(ready);

        debug!(location = %settings.location, "Opened pooled connection");
        Ok(db)
    }

    fn check_in(&self, db: Database) {
        let mut state = self.lock_state();
        state.idle.push(db);
        drop(state);
        self.inner.available.notify_one();
    }

    fn forget_connection(&self) {
        let mut state = self.lock_state();
        state.open = state.open.saturating_sub(1);
        if state.open == 0 && matches!(self.inner.settings.location, DatabaseLocation::Memory { .. }) {
            *self.inner.schema_ready.lock().unwrap_or_else(PoisonError::into_inner) = false;
            debug!(location = %self.inner.settings.location, "Last in-memory connection closed");
        }
        drop(state);
        self.inner.available.notify_one();
    }

    // Pool bookkeeping stays consistent even if a holder panicked.
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A checked-out connection. Dropping it checks the connection back in.
pub struct PooledConnection {
    db: Option<Database>,
    manager: ConnectionManager,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("checked_out", &self.db.is_some())
            .field("manager", &self.manager)
            .finish()
    }
}

impl PooledConnection {
    fn new(db: Database, manager: ConnectionManager) -> Self {
        Self { db: Some(db), manager }
    }

    /// Check the connection in now rather than at end of scope.
    pub fn release(mut self) {
        self.give_back();
    }

    /// Close the connection instead of returning it to the pool.
    pub fn discard(mut self) {
        if self.db.take().is_some() {
            self.manager.forget_connection();
        }
    }

    fn give_back(&mut self) {
        if let Some(db) = self.db.take() {
            self.manager.check_in(db);
        }
    }
}

impl Deref for PooledConnection {
    type Target = Database;

    fn deref(&self) -> &Database {
        self.db.as_ref().expect("connection is held until the guard is consumed")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Database {
        self.db.as_mut().expect("connection is held until the guard is consumed")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.give_back();
    }
}

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatistics {
    pub idle_connections: usize,
    pub open_connections: usize,
    pub max_connections: usize,
}
