use crate::artifacts::{ArtifactRef, TrainedArtifact};
use crate::error::{TrainingError, TrainingResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const ARTIFACT_EXTENSION: &str = "mdl";

/// Filesystem layout for artifact blobs: `<root>/<model identifier>.mdl`.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a model's blob. Rejects identifiers that would escape the root.
    pub fn artifact_path(&self, model_id: &str) -> TrainingResult<PathBuf> {
        if model_id.is_empty()
            || model_id.contains(['/', '\\'])
            || model_id.starts_with('.')
        {
            return Err(TrainingError::invalid("model", format!("invalid model identifier `{model_id}`")));
        }
        Ok(self.root.join(format!("{model_id}.{ARTIFACT_EXTENSION}")))
    }

    pub fn reference(&self, model_id: &str) -> TrainingResult<ArtifactRef> {
        Ok(ArtifactRef::path(self.artifact_path(model_id)?))
    }

    pub fn ensure_root(&self) -> TrainingResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn save(&self, model_id: &str, artifact: &TrainedArtifact) -> TrainingResult<PathBuf> {
        let path = self.artifact_path(model_id)?;
        artifact.write(&path)?;
        Ok(path)
    }

    pub fn load(&self, model_id: &str) -> TrainingResult<TrainedArtifact> {
        TrainedArtifact::read(&self.artifact_path(model_id)?)
    }

    /// Delete a blob; returns whether a file was removed.
    pub fn remove(&self, model_id: &str) -> TrainingResult<bool> {
        let path = self.artifact_path(model_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Identifiers of every blob under the root.
    pub fn list_identifiers(&self) -> TrainingResult<BTreeSet<String>> {
        let mut out = BTreeSet::new();

        let dir = match std::fs::read_dir(&self.root) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };

        for entry in dir {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.insert(stem.to_string());
            }
        }

        Ok(out)
    }

    /// Blobs with no matching registry identifier.
    pub fn orphaned_artifacts(&self, known: &BTreeSet<String>) -> TrainingResult<Vec<String>> {
        Ok(self.list_identifiers()?.into_iter().filter(|id| !known.contains(id)).collect())
    }
}
