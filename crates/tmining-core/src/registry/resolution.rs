//! Identity resolution for model names.
//!
//! A requested name is kept unless it would be ambiguous, in which case the
//! model silently falls back to its own identifier:
//!
//! 1. the name equals the identifier of some other model;
//! 2. the name is already used in the target namespace. For a shared model
//!    that is other owners' shared models, for a private model the owner's
//!    own private models.
//!
//! The model being written is never considered a collision with itself.

use tracing::info;

use crate::storage::{ModelRepository, StorageResult};

/// Why a name was or was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameResolution {
    Requested,
    IdentifierCollision,
    NameCollision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    pub resolution: NameResolution,
}

pub fn resolve_name<R: ModelRepository + ?Sized>(
    models: &R,
    requested: &str,
    shared: bool,
    owner: &str,
    model_id: &str,
) -> StorageResult<ResolvedName> {
    let resolution = if models.identifier_taken(requested, model_id)? {
        NameResolution::IdentifierCollision
    } else if models.name_taken(requested, shared, owner, model_id)? {
        NameResolution::NameCollision
    } else {
        NameResolution::Requested
    };

    let name = match resolution {
        NameResolution::Requested => requested.to_string(),
        NameResolution::IdentifierCollision | NameResolution::NameCollision => {
            info!(
                model_id = %model_id,
                requested = %requested,
                ?resolution,
                "Model name unavailable, using identifier"
            );
            model_id.to_string()
        }
    };
    Ok(ResolvedName { name, resolution })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelRecord;
    use crate::storage::{Database, SqliteModelRepository, SqliteUserRepository, UserRepository};
    use serde_json::json;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        let users = SqliteUserRepository::new(db.conn());
        for (id, sub) in [("alice", "a"), ("bob", "b")] {
            users.create(id, None, json!({ "sub": sub }).as_object().unwrap()).unwrap();
        }
        let models = SqliteModelRepository::new(db.conn());
        for (name, id, shared, owner) in
            [("spam", "m-1", false, "alice"), ("news", "m-2", true, "bob"), ("mine", "m-3", true, "alice")]
        {
            models
                .create(&ModelRecord {
                    name: name.to_string(),
                    identifier: id.to_string(),
                    shared,
                    owner_identifier: owner.to_string(),
                })
                .unwrap();
        }
        db
    }

    #[test]
    fn test_free_name_kept() {
        let db = seeded();
        let models = SqliteModelRepository::new(db.conn());
        let resolved = resolve_name(&models, "fresh", false, "alice", "new").unwrap();
        assert_eq!(resolved.name, "fresh");
        assert_eq!(resolved.resolution, NameResolution::Requested);
    }

    #[test]
    fn test_name_equal_to_other_identifier_falls_back() {
        let db = seeded();
        let models = SqliteModelRepository::new(db.conn());
        let resolved = resolve_name(&models, "m-2", false, "alice", "new").unwrap();
        assert_eq!(resolved.name, "new");
        assert_eq!(resolved.resolution, NameResolution::IdentifierCollision);
    }

    #[test]
    fn test_private_collision_falls_back() {
        let db = seeded();
        let models = SqliteModelRepository::new(db.conn());
        assert_eq!(resolve_name(&models, "spam", false, "alice", "new").unwrap().name, "new");
        // Another owner's private namespace is separate.
        assert_eq!(resolve_name(&models, "spam", false, "bob", "new").unwrap().name, "spam");
    }

    #[test]
    fn test_shared_collision_checks_other_owners_only() {
        let db = seeded();
        let models = SqliteModelRepository::new(db.conn());
        assert_eq!(resolve_name(&models, "news", true, "alice", "new").unwrap().name, "new");
        assert_eq!(resolve_name(&models, "mine", true, "alice", "new").unwrap().name, "mine");
        // Private names do not block shared ones.
        assert_eq!(resolve_name(&models, "spam", true, "bob", "new").unwrap().name, "spam");
    }

    #[test]
    fn test_written_model_does_not_collide_with_itself() {
        let db = seeded();
        let models = SqliteModelRepository::new(db.conn());
        assert_eq!(resolve_name(&models, "spam", false, "alice", "m-1").unwrap().name, "spam");
        assert_eq!(resolve_name(&models, "m-1", false, "alice", "m-1").unwrap().name, "m-1");
    }
}
