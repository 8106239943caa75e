//! `ModelService` ties the registry to the artifact store.
//!
//! Registry rows and artifact blobs are written in two steps. Training and
//! upload write the blob first and remove it again if registration fails;
//! deletion removes the row first, so a crash can at worst leave an orphaned
//! blob, which [`ModelService::reconcile`] finds.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use tmining_training::{
    predict_with, train_model, validate_model, ArtifactLayout, Columns, DatasetSource, Evaluation, Label,
    ProgressSink, TrainedArtifact, TrainingJobSpec, ValidationSpec, DEFAULT_SEED,
};

use crate::config::CoreConfig;
use crate::models::ModelRecord;
use crate::registry::ModelRegistry;
use crate::storage::{ConnectionManager, StorageError};
use crate::training::error::{ServiceError, ServiceResult};

/// A freshly trained and registered model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredModel {
    pub model: ModelRecord,
    /// Held-out scores of the selected split; `None` without validation.
    pub accuracy: Option<f64>,
    pub f1: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ModelService {
    registry: ModelRegistry,
    layout: ArtifactLayout,
    seed: u64,
}

impl ModelService {
    pub fn new(registry: ModelRegistry, layout: ArtifactLayout) -> Self {
        Self { registry, layout, seed: DEFAULT_SEED }
    }

    /// Open the configured database and artifact directory.
    pub fn from_config(config: &CoreConfig) -> ServiceResult<Self> {
        let pool = ConnectionManager::new(config.pool_settings())?;
        let layout = config.artifact_layout();
        layout.ensure_root()?;
        Ok(Self::new(ModelRegistry::new(pool), layout).with_seed(config.seed()))
    }

    /// Seed used for validation splits.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Train `job`, store the artifact under a new identifier and register it
    /// for `owner`.
    pub fn train_and_register(
        &self,
        owner: &str,
        job: &TrainingJobSpec,
        name: Option<&str>,
        shared: bool,
        progress: &dyn ProgressSink,
    ) -> ServiceResult<RegisteredModel> {
        self.require_user(owner)?;
        let outcome = train_model(job, progress)?;
        let model = self.store_and_register(owner, &outcome.artifact, name, shared)?;
        Ok(RegisteredModel { model, accuracy: outcome.accuracy, f1: outcome.f1 })
    }

    /// Register an artifact produced elsewhere. The blob must load as a
    /// trained artifact and a name is required.
    pub fn upload(&self, owner: &str, bytes: &[u8], name: &str, shared: bool) -> ServiceResult<ModelRecord> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidParameter { field: "name", reason: "model name not provided".to_string() });
        }
        self.require_user(owner)?;
        let artifact = TrainedArtifact::from_bytes(bytes)?;
        self.store_and_register(owner, &artifact, Some(name), shared)
    }

    /// Serialized artifact of a model `reader` may read.
    pub fn download(&self, reader: &str, reference: &str) -> ServiceResult<(ModelRecord, Vec<u8>)> {
        let model = self.resolve_readable(reader, reference)?;
        let bytes = self.layout.load(&model.identifier)?.to_bytes()?;
        Ok((model, bytes))
    }

    /// Delete `owner`'s model and its artifact. `false` if the owner has no
    /// such model.
    pub fn delete(&self, owner: &str, model_id: &str) -> ServiceResult<bool> {
        if !self.registry.remove_model(owner, model_id)? {
            return Ok(false);
        }
        if !self.layout.remove(model_id)? {
            warn!(model_id = %model_id, "Removed model had no artifact");
        }
        Ok(true)
    }

    /// Delete a user, its models and their artifacts.
    pub fn remove_user(&self, identifier: &str) -> ServiceResult<Vec<String>> {
        let removed = self.registry.remove_user(identifier)?;
        for model_id in &removed {
            self.layout.remove(model_id)?;
        }
        Ok(removed)
    }

    /// Score a readable model on a dataset.
    pub fn validate_model(
        &self,
        reader: &str,
        reference: &str,
        dataset: DatasetSource,
        columns: Columns,
        size: f64,
    ) -> ServiceResult<Evaluation> {
        let model = self.resolve_readable(reader, reference)?;
        let mut spec = ValidationSpec::new(dataset, self.layout.reference(&model.identifier)?)
            .with_size(size)
            .with_seed(self.seed);
        spec.columns = columns;
        Ok(validate_model(&spec)?)
    }

    /// Predict the label of `text` with a readable model.
    pub fn predict_with_model(&self, reader: &str, reference: &str, text: &str) -> ServiceResult<Label> {
        let model = self.resolve_readable(reader, reference)?;
        let artifact = self.layout.load(&model.identifier)?;
        Ok(predict_with(&artifact, text)?)
    }

    /// A model `reader` may read, looked up by identifier, falling back to
    /// the reader's own models by name.
    pub fn resolve_readable(&self, reader: &str, reference: &str) -> ServiceResult<ModelRecord> {
        if let Some(model) = self.registry.find_readable_model(reader, reference)? {
            return Ok(model);
        }
        self.registry
            .get_model_by_name(reader, reference)?
            .ok_or_else(|| ServiceError::ModelNotFound(reference.to_string()))
    }

    /// Artifacts with no registry row. With `delete` they are also removed.
    pub fn reconcile(&self, delete: bool) -> ServiceResult<Vec<String>> {
        let known = self.registry.model_identifiers()?;
        let orphans = self.layout.orphaned_artifacts(&known)?;
        if delete {
            for model_id in &orphans {
                self.layout.remove(model_id)?;
            }
        }
        info!(orphans = orphans.len(), deleted = delete, "Reconciled artifact store");
        Ok(orphans)
    }

    fn require_user(&self, owner: &str) -> ServiceResult<()> {
        match self.registry.get_user_by_identifier(owner)? {
            Some(_) => Ok(()),
            None => Err(StorageError::UnknownUser(owner.to_string()).into()),
        }
    }

    fn store_and_register(
        &self,
        owner: &str,
        artifact: &TrainedArtifact,
        name: Option<&str>,
        shared: bool,
    ) -> ServiceResult<ModelRecord> {
        let model_id = Uuid::new_v4().to_string();
        self.layout.save(&model_id, artifact)?;

        match self.registry.add_model(owner, &model_id, name, shared) {
            Ok(model) => Ok(model),
            Err(e) => {
                if let Err(cleanup) = self.layout.remove(&model_id) {
                    warn!(model_id = %model_id, error = %cleanup, "Failed to remove unregistered artifact");
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tmining_training::{TracingProgressSink, TrainingError};

    fn review_csv(rows: usize) -> Vec<u8> {
        let mut out = String::from("text,target\n");
        for i in 0..rows {
            let text = if i % 2 == 0 { "great excellent movie" } else { "awful boring movie" };
            out.push_str(&format!("{text} {i},{}\n", i32::from(i % 2 == 0)));
        }
        out.into_bytes()
    }

    fn service(temp: &TempDir) -> ModelService {
        let registry = ModelRegistry::in_memory().unwrap();
        for id in ["alice", "bob"] {
            registry.add_user(id, None, json!({ "sub": id }).as_object().unwrap()).unwrap();
        }
        ModelService::new(registry, ArtifactLayout::new(temp.path().to_path_buf()))
    }

    fn train(service: &ModelService, owner: &str, name: &str, shared: bool) -> RegisteredModel {
        let job = TrainingJobSpec::new(DatasetSource::bytes(review_csv(40)));
        service.train_and_register(owner, &job, Some(name), shared, &TracingProgressSink).unwrap()
    }

    #[test]
    fn test_train_and_register_stores_blob() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let trained = train(&service, "alice", "reviews", false);

        assert_eq!(trained.model.name, "reviews");
        assert!(trained.accuracy.is_none());
        assert!(service.layout().artifact_path(&trained.model.identifier).unwrap().exists());
    }

    #[test]
    fn test_unknown_owner_fails_before_training() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let job = TrainingJobSpec::new(DatasetSource::path("missing.csv"));
        let err = service.train_and_register("ghost", &job, None, false, &TracingProgressSink).unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, ServiceError::Storage(StorageError::UnknownUser(_))));
    }

    #[test]
    fn test_private_models_are_not_readable_by_others() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let private = train(&service, "alice", "mine", false).model;
        let shared = train(&service, "alice", "ours", true).model;

        assert_eq!(service.predict_with_model("alice", &private.identifier, "great movie").unwrap(), 1);
        assert!(matches!(
            service.predict_with_model("bob", &private.identifier, "great movie"),
            Err(ServiceError::ModelNotFound(_))
        ));
        assert!(service.predict_with_model("bob", &shared.identifier, "awful movie").is_ok());
        // Own models resolve by name too.
        assert_eq!(service.resolve_readable("alice", "mine").unwrap(), private);
    }

    #[test]
    fn test_delete_removes_row_and_blob() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let model = train(&service, "alice", "gone", true).model;
        let path = service.layout().artifact_path(&model.identifier).unwrap();

        assert!(!service.delete("bob", &model.identifier).unwrap());
        assert!(path.exists());
        assert!(service.delete("alice", &model.identifier).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_upload_round_trip() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let original = train(&service, "alice", "source", false).model;
        let (_, bytes) = service.download("alice", &original.identifier).unwrap();

        let uploaded = service.upload("bob", &bytes, "copy", false).unwrap();
        assert_ne!(uploaded.identifier, original.identifier);
        assert_eq!(uploaded.owner_identifier, "bob");

        let err = service.upload("bob", b"not a model", "junk", false).unwrap_err();
        assert!(matches!(err, ServiceError::Training(_)));
        assert!(matches!(
            service.upload("bob", &bytes, " ", false),
            Err(ServiceError::InvalidParameter { field: "name", .. })
        ));
    }

    #[test]
    fn test_upload_rejects_resigned_inconsistent_artifact() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let original = train(&service, "alice", "source", false).model;
        let (_, bytes) = service.download("alice", &original.identifier).unwrap();

        let artifact = TrainedArtifact::from_bytes(&bytes).unwrap();
        let mut pipeline = serde_json::to_value(&artifact.pipeline).unwrap();
        pipeline["vectorizer"]["kind"] = "tfidf".into();
        pipeline["vectorizer"]["idf"] = json!([]);
        let pipeline: tmining_training::Pipeline = serde_json::from_value(pipeline).unwrap();
        let forged = TrainedArtifact::new(artifact.manifest, pipeline).unwrap().to_bytes().unwrap();

        let err = service.upload("bob", &forged, "forged", false).unwrap_err();
        assert!(matches!(err, ServiceError::Training(TrainingError::Artifact(_))), "{err}");
        assert!(service.registry().list_models("bob", false).unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_finds_orphans() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let kept = train(&service, "alice", "kept", false).model;
        std::fs::write(temp.path().join("stray.mdl"), b"{}").unwrap();

        assert_eq!(service.reconcile(false).unwrap(), vec!["stray".to_string()]);
        assert_eq!(service.reconcile(true).unwrap(), vec!["stray".to_string()]);
        assert!(service.reconcile(false).unwrap().is_empty());
        assert!(service.layout().artifact_path(&kept.identifier).unwrap().exists());
    }

    #[test]
    fn test_validate_registered_model() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let model = train(&service, "alice", "scored", false).model;

        let evaluation = service
            .validate_model("alice", &model.identifier, DatasetSource::bytes(review_csv(40)), Columns::default(), 1.0)
            .unwrap();
        assert_eq!(evaluation.evaluated_rows, 40);
    }
}
