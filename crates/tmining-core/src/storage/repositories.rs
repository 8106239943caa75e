//! Row-level access to the `users` and `models` tables.
//!
//! Repositories borrow a connection (or an open transaction) and run plain
//! statements on it; atomicity is the caller's concern.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::models::{Claims, ModelRecord, User};
use crate::storage::error::{StorageError, StorageResult};

const USER_COLUMNS: &str = "sub, uuid, token, auth_info";
const MODEL_COLUMNS: &str = "name, uuid, shared, user_uuid";

// ============================================================================
// Row Parsing Helpers
// ============================================================================

/// Parses the optional JSON profile column.
fn parse_profile(row: &Row, idx: usize) -> rusqlite::Result<Claims> {
    let json_str: Option<String> = row.get(idx)?;
    match json_str {
        Some(s) => serde_json::from_str(&s).map_err(|_| {
            rusqlite::Error::InvalidColumnType(idx, "auth_info".to_string(), rusqlite::types::Type::Text)
        }),
        None => Ok(Claims::new()),
    }
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        subject: row.get(0)?,
        identifier: row.get(1)?,
        credential: row.get(2)?,
        profile: parse_profile(row, 3)?,
    })
}

fn model_from_row(row: &Row) -> rusqlite::Result<ModelRecord> {
    Ok(ModelRecord { name: row.get(0)?, identifier: row.get(1)?, shared: row.get(2)?, owner_identifier: row.get(3)? })
}

// ============================================================================
// Repository Traits
// ============================================================================

/// Repository trait for user operations.
pub trait UserRepository {
    /// Inserts a user keyed by the subject of `claims`.
    fn create(&self, identifier: &str, credential: Option<&str>, claims: &Claims) -> StorageResult<User>;

    fn get_by_subject(&self, subject: &str) -> StorageResult<Option<User>>;

    fn get_by_identifier(&self, identifier: &str) -> StorageResult<Option<User>>;

    /// Replaces credential and profile; returns whether a row changed.
    fn update(&self, subject: &str, credential: Option<&str>, claims: &Claims) -> StorageResult<bool>;

    fn delete(&self, identifier: &str) -> StorageResult<bool>;
}

/// Repository trait for model metadata operations.
pub trait ModelRepository {
    fn create(&self, model: &ModelRecord) -> StorageResult<()>;

    /// Any model with this identifier, regardless of owner.
    fn get(&self, identifier: &str) -> StorageResult<Option<ModelRecord>>;

    fn get_owned(&self, owner: &str, identifier: &str) -> StorageResult<Option<ModelRecord>>;

    fn get_owned_by_name(&self, owner: &str, name: &str) -> StorageResult<Option<ModelRecord>>;

    /// Models owned by `owner`, plus every shared model when `include_shared`.
    fn list_visible(&self, owner: &str, include_shared: bool) -> StorageResult<Vec<ModelRecord>>;

    fn list_owned(&self, owner: &str) -> StorageResult<Vec<ModelRecord>>;

    fn list_identifiers(&self) -> StorageResult<Vec<String>>;

    fn update(&self, model: &ModelRecord) -> StorageResult<bool>;

    fn delete_owned(&self, owner: &str, identifier: &str) -> StorageResult<bool>;

    /// Deletes every model of `owner`; returns their identifiers.
    fn delete_all_owned(&self, owner: &str) -> StorageResult<Vec<String>>;

    /// Whether a model other than `excluding` has identifier `identifier`.
    fn identifier_taken(&self, identifier: &str, excluding: &str) -> StorageResult<bool>;

    /// Whether a model other than `excluding` already uses `name` in the
    /// namespace selected by `shared`: other owners' shared models when
    /// `shared`, otherwise the owner's own private models.
    fn name_taken(&self, name: &str, shared: bool, owner: &str, excluding: &str) -> StorageResult<bool>;
}

// ============================================================================
// SQLite Implementations
// ============================================================================

/// SQLite implementation of `UserRepository`.
pub struct SqliteUserRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteUserRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn get_where(&self, column: &str, value: &str) -> StorageResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
        Ok(self.conn.query_row(&sql, params![value], user_from_row).optional()?)
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create(&self, identifier: &str, credential: Option<&str>, claims: &Claims) -> StorageResult<User> {
        let subject = User::subject_of(claims)
            .ok_or_else(|| StorageError::invalid("claims", "claims carry no string `sub`"))?
            .to_string();
        let profile = serde_json::to_string(claims)?;

        self.conn.execute(
            "INSERT INTO users (sub, uuid, token, auth_info) VALUES (?1, ?2, ?3, ?4)",
            params![subject, identifier, credential, profile],
        )?;
        debug!(subject = %subject, user_id = %identifier, "Inserted user");

        Ok(User {
            subject,
            identifier: identifier.to_string(),
            credential: credential.map(str::to_string),
            profile: claims.clone(),
        })
    }

    fn get_by_subject(&self, subject: &str) -> StorageResult<Option<User>> {
        self.get_where("sub", subject)
    }

    fn get_by_identifier(&self, identifier: &str) -> StorageResult<Option<User>> {
        self.get_where("uuid", identifier)
    }

    fn update(&self, subject: &str, credential: Option<&str>, claims: &Claims) -> StorageResult<bool> {
        let profile = serde_json::to_string(claims)?;
        let changed = self.conn.execute(
            "UPDATE users SET token = ?1, auth_info = ?2 WHERE sub = ?3",
            params![credential, profile, subject],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, identifier: &str) -> StorageResult<bool> {
        let changed = self.conn.execute("DELETE FROM users WHERE uuid = ?1", params![identifier])?;
        Ok(changed > 0)
    }
}

/// SQLite implementation of `ModelRepository`.
pub struct SqliteModelRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteModelRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn query_models(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<Vec<ModelRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let models = stmt.query_map(params, model_from_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(models)
    }
}

impl ModelRepository for SqliteModelRepository<'_> {
    fn create(&self, model: &ModelRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO models (name, uuid, shared, user_uuid) VALUES (?1, ?2, ?3, ?4)",
            params![model.name, model.identifier, model.shared, model.owner_identifier],
        )?;
        Ok(())
    }

    fn get(&self, identifier: &str) -> StorageResult<Option<ModelRecord>> {
        let sql = format!("SELECT {MODEL_COLUMNS} FROM models WHERE uuid = ?1");
        Ok(self.conn.query_row(&sql, params![identifier], model_from_row).optional()?)
    }

    fn get_owned(&self, owner: &str, identifier: &str) -> StorageResult<Option<ModelRecord>> {
        let sql = format!("SELECT {MODEL_COLUMNS} FROM models WHERE uuid = ?1 AND user_uuid = ?2");
        Ok(self.conn.query_row(&sql, params![identifier, owner], model_from_row).optional()?)
    }

    fn get_owned_by_name(&self, owner: &str, name: &str) -> StorageResult<Option<ModelRecord>> {
        let sql = format!("SELECT {MODEL_COLUMNS} FROM models WHERE name = ?1 AND user_uuid = ?2 ORDER BY rowid LIMIT 1");
        Ok(self.conn.query_row(&sql, params![name, owner], model_from_row).optional()?)
    }

    fn list_visible(&self, owner: &str, include_shared: bool) -> StorageResult<Vec<ModelRecord>> {
        let sql = format!(
            "SELECT {MODEL_COLUMNS} FROM models WHERE user_uuid = ?1 OR (?2 AND shared = 1) ORDER BY rowid"
        );
        self.query_models(&sql, params![owner, include_shared])
    }

    fn list_owned(&self, owner: &str) -> StorageResult<Vec<ModelRecord>> {
        let sql = format!("SELECT {MODEL_COLUMNS} FROM models WHERE user_uuid = ?1 ORDER BY rowid");
        self.query_models(&sql, params![owner])
    }

    fn list_identifiers(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT uuid FROM models ORDER BY rowid")?;
        let ids = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn update(&self, model: &ModelRecord) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE models SET name = ?1, shared = ?2 WHERE uuid = ?3 AND user_uuid = ?4",
            params![model.name, model.shared, model.identifier, model.owner_identifier],
        )?;
        Ok(changed > 0)
    }

    fn delete_owned(&self, owner: &str, identifier: &str) -> StorageResult<bool> {
        let changed =
            self.conn.execute("DELETE FROM models WHERE uuid = ?1 AND user_uuid = ?2", params![identifier, owner])?;
        Ok(changed > 0)
    }

    fn delete_all_owned(&self, owner: &str) -> StorageResult<Vec<String>> {
        let removed = self.list_owned(owner)?.into_iter().map(|m| m.identifier).collect();
        self.conn.execute("DELETE FROM models WHERE user_uuid = ?1", params![owner])?;
        Ok(removed)
    }

    fn identifier_taken(&self, identifier: &str, excluding: &str) -> StorageResult<bool> {
        let mut stmt = self.conn.prepare_cached("SELECT 1 FROM models WHERE uuid = ?1 AND uuid != ?2")?;
        Ok(stmt.exists(params![identifier, excluding])?)
    }

    fn name_taken(&self, name: &str, shared: bool, owner: &str, excluding: &str) -> StorageResult<bool> {
        let sql = if shared {
            "SELECT 1 FROM models WHERE name = ?1 AND shared = 1 AND user_uuid != ?2 AND uuid != ?3"
        } else {
            "SELECT 1 FROM models WHERE name = ?1 AND shared = 0 AND user_uuid = ?2 AND uuid != ?3"
        };
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.exists(params![name, owner, excluding])?)
    }
}
