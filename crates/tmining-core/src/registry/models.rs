use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::models::ModelRecord;
use crate::registry::resolution::resolve_name;
use crate::registry::ModelRegistry;
use crate::storage::{
    ModelRepository, SqliteModelRepository, SqliteUserRepository, StorageError, StorageResult, UserRepository,
};

/// Empty names count as absent.
fn requested(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty())
}

impl ModelRegistry {
    /// Register model metadata for `owner`.
    ///
    /// With no (or an empty) `name` the identifier doubles as the name.
    /// Otherwise the name goes through identity resolution and may come back
    /// as the identifier.
    ///
    /// # Errors
    /// * `StorageError::UnknownUser` - If `owner` is not registered
    /// * `StorageError::DuplicateModel` - If `model_id` is already registered
    pub fn add_model(&self, owner: &str, model_id: &str, name: Option<&str>, shared: bool) -> StorageResult<ModelRecord> {
        if model_id.is_empty() {
            return Err(StorageError::invalid("model", "model identifier must not be empty"));
        }

        let mut conn = self.pool.acquire()?;
        let model = conn.transaction(|tx| {
            if SqliteUserRepository::new(tx).get_by_identifier(owner)?.is_none() {
                return Err(StorageError::UnknownUser(owner.to_string()));
            }
            let models = SqliteModelRepository::new(tx);
            if models.get(model_id)?.is_some() {
                return Err(StorageError::DuplicateModel(model_id.to_string()));
            }

            let name = match requested(name) {
                Some(name) => resolve_name(&models, name, shared, owner, model_id)?.name,
                None => model_id.to_string(),
            };
            let model =
                ModelRecord { name, identifier: model_id.to_string(), shared, owner_identifier: owner.to_string() };
            models.create(&model)?;
            Ok(model)
        })?;

        info!(user_id = %owner, model_id = %model.identifier, name = %model.name, shared, "Registered model");
        Ok(model)
    }

    /// Delete `owner`'s model; returns whether a row was removed.
    pub fn remove_model(&self, owner: &str, model_id: &str) -> StorageResult<bool> {
        let mut conn = self.pool.acquire()?;
        let removed = conn.transaction(|tx| SqliteModelRepository::new(tx).delete_owned(owner, model_id))?;
        if removed {
            info!(user_id = %owner, model_id = %model_id, "Removed model");
        }
        Ok(removed)
    }

    /// Rename and/or reshare `owner`'s model.
    ///
    /// A new name goes through identity resolution in the namespace of the
    /// resulting `shared` flag. With neither field given the current state is
    /// returned unchanged. `None` when the owner has no such model.
    pub fn edit_model(
        &self,
        owner: &str,
        model_id: &str,
        name: Option<&str>,
        shared: Option<bool>,
    ) -> StorageResult<Option<ModelRecord>> {
        let name = requested(name);

        let mut conn = self.pool.acquire()?;
        let edited = conn.transaction(|tx| {
            let models = SqliteModelRepository::new(tx);
            let Some(mut model) = models.get_owned(owner, model_id)? else {
                return Ok(None);
            };
            if name.is_none() && shared.is_none() {
                return Ok(Some(model));
            }

            if let Some(shared) = shared {
                model.shared = shared;
            }
            if let Some(name) = name {
                model.name = resolve_name(&models, name, model.shared, owner, model_id)?.name;
            }
            models.update(&model)?;
            Ok(Some(model))
        })?;

        if let Some(model) = &edited {
            info!(user_id = %owner, model_id = %model_id, name = %model.name, shared = model.shared, "Edited model");
        }
        Ok(edited)
    }

    /// Models owned by `user`, plus every shared model when `include_shared`,
    /// in insertion order.
    pub fn list_models(&self, user: &str, include_shared: bool) -> StorageResult<Vec<ModelRecord>> {
        let mut conn = self.pool.acquire()?;
        let models = conn.transaction(|tx| SqliteModelRepository::new(tx).list_visible(user, include_shared))?;
        debug!(user_id = %user, include_shared, count = models.len(), "Listed models");
        Ok(models)
    }

    pub fn get_model_by_identifier(&self, owner: &str, model_id: &str) -> StorageResult<Option<ModelRecord>> {
        let conn = self.pool.acquire()?;
        SqliteModelRepository::new(conn.conn()).get_owned(owner, model_id)
    }

    /// First of `owner`'s models called `name`.
    pub fn get_model_by_name(&self, owner: &str, name: &str) -> StorageResult<Option<ModelRecord>> {
        let conn = self.pool.acquire()?;
        SqliteModelRepository::new(conn.conn()).get_owned_by_name(owner, name)
    }

    /// Sharing flag of any model; `None` if it does not exist.
    pub fn model_is_shared(&self, model_id: &str) -> StorageResult<Option<bool>> {
        let conn = self.pool.acquire()?;
        Ok(SqliteModelRepository::new(conn.conn()).get(model_id)?.map(|m| m.shared))
    }

    /// The model if `reader` owns it or it is shared.
    pub fn find_readable_model(&self, reader: &str, model_id: &str) -> StorageResult<Option<ModelRecord>> {
        let conn = self.pool.acquire()?;
        let model = SqliteModelRepository::new(conn.conn()).get(model_id)?;
        Ok(model.filter(|m| m.is_readable_by(reader)))
    }

    /// Identifiers of every registered model.
    pub fn model_identifiers(&self) -> StorageResult<BTreeSet<String>> {
        let conn = self.pool.acquire()?;
        Ok(SqliteModelRepository::new(conn.conn()).list_identifiers()?.into_iter().collect())
    }
}
