use crate::capability::{Algorithm, VectorizerKind};
use crate::dataset::DatasetId;
use crate::error::{TrainingError, TrainingResult};
use crate::job::TrainingJobId;
use crate::metrics::Scores;
use crate::trainer::Pipeline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const ARTIFACT_FORMAT: u32 = 1;

/// Where a trained artifact can be loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactRef {
    Path { path: PathBuf },
    Bytes { bytes: Vec<u8> },
}

impl ArtifactRef {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path { path: path.into() }
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes { bytes: bytes.into() }
    }
}

/// How an artifact was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingManifest {
    pub job_id: TrainingJobId,
    pub created_at: DateTime<Utc>,
    pub algorithm: Algorithm,
    pub vectorizer: VectorizerKind,
    pub dataset_id: DatasetId,
    pub rows: usize,
    /// Best split scores; absent when trained without a held-out split.
    #[serde(default)]
    pub metrics: Option<Scores>,
}

/// A fitted pipeline plus its manifest, checksummed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub format: u32,
    pub manifest: TrainingManifest,
    pub pipeline: Pipeline,
    /// SHA-256 of the serialized pipeline.
    pub sha256: String,
}

impl TrainedArtifact {
    pub fn new(manifest: TrainingManifest, pipeline: Pipeline) -> TrainingResult<Self> {
        let sha256 = pipeline_digest(&pipeline)?;
        Ok(Self { format: ARTIFACT_FORMAT, manifest, pipeline, sha256 })
    }

    pub fn to_bytes(&self) -> TrainingResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode and verify an artifact blob.
    pub fn from_bytes(bytes: &[u8]) -> TrainingResult<Self> {
        let artifact: Self = serde_json::from_slice(bytes)
            .map_err(|e| TrainingError::Artifact(format!("file is not a model: {e}")))?;
        if artifact.format != ARTIFACT_FORMAT {
            return Err(TrainingError::Artifact(format!(
                "unsupported artifact format {} (expected {ARTIFACT_FORMAT})",
                artifact.format
            )));
        }
        let digest = pipeline_digest(&artifact.pipeline)?;
        if digest != artifact.sha256 {
            return Err(TrainingError::Artifact("artifact checksum mismatch".to_string()));
        }
        artifact.pipeline.check()?;
        Ok(artifact)
    }

    pub fn load(reference: &ArtifactRef) -> TrainingResult<Self> {
        match reference {
            ArtifactRef::Path { path } => Self::read(path),
            ArtifactRef::Bytes { bytes } => {
                if bytes.is_empty() {
                    return Err(TrainingError::ArtifactNotFound("no model provided".to_string()));
                }
                Self::from_bytes(bytes)
            }
        }
    }

    pub fn read(path: &Path) -> TrainingResult<Self> {
        if !path.is_file() {
            return Err(TrainingError::ArtifactNotFound(path.display().to_string()));
        }
        Self::from_bytes(&std::fs::read(path)?)
    }

    pub fn write(&self, path: &Path) -> TrainingResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

fn pipeline_digest(pipeline: &Pipeline) -> TrainingResult<String> {
    let bytes = serde_json::to_vec(pipeline)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::Estimator;
    use tempfile::TempDir;

    fn fitted() -> TrainedArtifact {
        let mut pipeline = Pipeline::new(Algorithm::NaiveBayes, VectorizerKind::Count);
        pipeline
            .fit(&["good day".to_string(), "bad day".to_string()], &[1, 0])
            .unwrap();
        let manifest = TrainingManifest {
            job_id: TrainingJobId("job-1".to_string()),
            created_at: Utc::now(),
            algorithm: Algorithm::NaiveBayes,
            vectorizer: VectorizerKind::Count,
            dataset_id: DatasetId("abc".to_string()),
            rows: 2,
            metrics: None,
        };
        TrainedArtifact::new(manifest, pipeline).unwrap()
    }

    #[test]
    fn test_missing_path_is_artifact_not_found() {
        let err = TrainedArtifact::load(&ArtifactRef::path("nope/missing.mdl")).unwrap_err();
        assert!(matches!(err, TrainingError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_write_then_read_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("models").join("m.mdl");
        let artifact = fitted();
        artifact.write(&path).unwrap();

        let loaded = TrainedArtifact::load(&ArtifactRef::path(&path)).unwrap();
        assert_eq!(loaded.sha256, artifact.sha256);
        assert_eq!(loaded.manifest.job_id, artifact.manifest.job_id);
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        let err = TrainedArtifact::load(&ArtifactRef::bytes(b"not a model".to_vec())).unwrap_err();
        assert!(matches!(err, TrainingError::Artifact(_)));
    }

    /// Edit the serialized pipeline, then sign it again so only the
    /// structural check can catch the damage.
    fn resigned(edit: impl FnOnce(&mut serde_json::Value)) -> Vec<u8> {
        let artifact = fitted();
        let mut pipeline = serde_json::to_value(&artifact.pipeline).unwrap();
        edit(&mut pipeline);
        let pipeline: Pipeline = serde_json::from_value(pipeline).unwrap();
        TrainedArtifact::new(artifact.manifest, pipeline).unwrap().to_bytes().unwrap()
    }

    #[test]
    fn test_resigned_inconsistent_pipeline_is_rejected() {
        let cases = [
            resigned(|p| {
                p["vectorizer"]["kind"] = "tfidf".into();
                p["vectorizer"]["idf"] = serde_json::json!([]);
            }),
            resigned(|p| p["model"]["classes"] = serde_json::json!([])),
            resigned(|p| p["model"]["feature_log_prob"] = serde_json::json!([[0.0], [0.0]])),
            resigned(|p| p["algorithm"] = "ridge".into()),
        ];
        for bytes in cases {
            let err = TrainedArtifact::from_bytes(&bytes).unwrap_err();
            assert!(matches!(err, TrainingError::Artifact(_)), "{err}");
        }
        assert!(TrainedArtifact::from_bytes(&resigned(|_| {})).is_ok());
    }

    #[test]
    fn test_tampered_checksum_is_rejected() {
        let mut artifact = fitted();
        artifact.sha256 = "0".repeat(64);
        let bytes = serde_json::to_vec(&artifact).unwrap();
        assert!(TrainedArtifact::from_bytes(&bytes).is_err());
    }
}
