use tracing::info;

use crate::models::{Claims, User, UserRecord};
use crate::registry::ModelRegistry;
use crate::storage::{
    ModelRepository, SqliteModelRepository, SqliteUserRepository, StorageError, StorageResult, UserRepository,
};

impl ModelRegistry {
    /// Register a user under the subject carried by `claims`.
    ///
    /// # Errors
    /// * `StorageError::InvalidParameter` - If `claims` has no string `sub`
    /// * `StorageError::DuplicateSubject` - If the subject is already registered
    /// * `StorageError::DuplicateIdentifier` - If the identifier is already taken
    pub fn add_user(&self, identifier: &str, credential: Option<&str>, claims: &Claims) -> StorageResult<User> {
        if identifier.is_empty() {
            return Err(StorageError::invalid("identifier", "user identifier must not be empty"));
        }
        let subject = User::subject_of(claims)
            .ok_or_else(|| StorageError::invalid("claims", "claims carry no string `sub`"))?
            .to_string();

        let mut conn = self.pool.acquire()?;
        let user = conn.transaction(|tx| {
            let users = SqliteUserRepository::new(tx);
            if users.get_by_subject(&subject)?.is_some() {
                return Err(StorageError::DuplicateSubject(subject.clone()));
            }
            if users.get_by_identifier(identifier)?.is_some() {
                return Err(StorageError::DuplicateIdentifier(identifier.to_string()));
            }
            users.create(identifier, credential, claims)
        })?;

        info!(subject = %user.subject, user_id = %user.identifier, "Registered user");
        Ok(user)
    }

    pub fn get_user_by_subject(&self, subject: &str) -> StorageResult<Option<UserRecord>> {
        let mut conn = self.pool.acquire()?;
        conn.transaction(|tx| {
            let user = SqliteUserRepository::new(tx).get_by_subject(subject)?;
            with_models(tx, user)
        })
    }

    pub fn get_user_by_identifier(&self, identifier: &str) -> StorageResult<Option<UserRecord>> {
        let mut conn = self.pool.acquire()?;
        conn.transaction(|tx| {
            let user = SqliteUserRepository::new(tx).get_by_identifier(identifier)?;
            with_models(tx, user)
        })
    }

    /// Replace the credential and profile of the user whose subject is
    /// carried by `claims`.
    ///
    /// # Errors
    /// * `StorageError::UnknownUser` - If no user has that subject
    pub fn update_user(&self, credential: Option<&str>, claims: &Claims) -> StorageResult<UserRecord> {
        let subject = User::subject_of(claims)
            .ok_or_else(|| StorageError::invalid("claims", "claims carry no string `sub`"))?
            .to_string();

        let mut conn = self.pool.acquire()?;
        conn.transaction(|tx| {
            let users = SqliteUserRepository::new(tx);
            if !users.update(&subject, credential, claims)? {
                return Err(StorageError::UnknownUser(subject.clone()));
            }
            with_models(tx, users.get_by_subject(&subject)?)?.ok_or_else(|| StorageError::UnknownUser(subject.clone()))
        })
    }

    /// Delete a user and the metadata of every model it owns. Returns the
    /// identifiers of the removed models so their artifacts can be dropped.
    ///
    /// # Errors
    /// * `StorageError::UnknownUser` - If no user has that identifier
    pub fn remove_user(&self, identifier: &str) -> StorageResult<Vec<String>> {
        let mut conn = self.pool.acquire()?;
        let removed = conn.transaction(|tx| {
            let users = SqliteUserRepository::new(tx);
            if users.get_by_identifier(identifier)?.is_none() {
                return Err(StorageError::UnknownUser(identifier.to_string()));
            }
            let removed = SqliteModelRepository::new(tx).delete_all_owned(identifier)?;
            users.delete(identifier)?;
            Ok(removed)
        })?;

        info!(user_id = %identifier, models = removed.len(), "Removed user");
        Ok(removed)
    }
}

fn with_models(conn: &rusqlite::Connection, user: Option<User>) -> StorageResult<Option<UserRecord>> {
    user.map(|user| {
        let models = SqliteModelRepository::new(conn).list_owned(&user.identifier)?;
        Ok(UserRecord { user, models })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> Claims {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_add_and_get_user() {
        let registry = ModelRegistry::in_memory().unwrap();
        registry.add_user("u-1", Some("tok"), &claims(json!({"sub": "alice"}))).unwrap();

        let record = registry.get_user_by_subject("alice").unwrap().unwrap();
        assert_eq!(record.user.identifier, "u-1");
        assert!(record.models.is_empty());
        assert_eq!(registry.get_user_by_identifier("u-1").unwrap(), Some(record));
        assert!(registry.get_user_by_subject("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_subject() {
        let registry = ModelRegistry::in_memory().unwrap();
        registry.add_user("u-1", None, &claims(json!({"sub": "alice"}))).unwrap();
        let err = registry.add_user("u-2", None, &claims(json!({"sub": "alice"}))).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateSubject(s) if s == "alice"));
    }

    #[test]
    fn test_duplicate_identifier() {
        let registry = ModelRegistry::in_memory().unwrap();
        registry.add_user("u-1", None, &claims(json!({"sub": "alice"}))).unwrap();
        let err = registry.add_user("u-1", None, &claims(json!({"sub": "bob"}))).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateIdentifier(_)));
    }

    #[test]
    fn test_update_user() {
        let registry = ModelRegistry::in_memory().unwrap();
        registry.add_user("u-1", Some("old"), &claims(json!({"sub": "alice"}))).unwrap();

        let updated = registry.update_user(Some("new"), &claims(json!({"sub": "alice", "exp": 10}))).unwrap();
        assert_eq!(updated.user.credential.as_deref(), Some("new"));
        assert_eq!(updated.user.profile.get("exp"), Some(&json!(10)));

        let err = registry.update_user(None, &claims(json!({"sub": "ghost"}))).unwrap_err();
        assert!(matches!(err, StorageError::UnknownUser(_)));
    }

    #[test]
    fn test_remove_user_drops_models() {
        let registry = ModelRegistry::in_memory().unwrap();
        registry.add_user("u-1", None, &claims(json!({"sub": "alice"}))).unwrap();
        registry.add_model("u-1", "m-1", Some("spam"), false).unwrap();
        registry.add_model("u-1", "m-2", None, true).unwrap();

        assert_eq!(registry.remove_user("u-1").unwrap(), vec!["m-1".to_string(), "m-2".to_string()]);
        assert!(registry.get_user_by_identifier("u-1").unwrap().is_none());
        assert_eq!(registry.model_is_shared("m-2").unwrap(), None);

        assert!(matches!(registry.remove_user("u-1"), Err(StorageError::UnknownUser(_))));
    }
}
