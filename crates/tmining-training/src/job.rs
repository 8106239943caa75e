use crate::artifacts::ArtifactRef;
use crate::capability::{Algorithm, VectorizerKind};
use crate::dataset::{Columns, DatasetSource};
use crate::error::{TrainingError, TrainingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seed used for every shuffle split unless the caller overrides it.
pub const DEFAULT_SEED: u64 = 0;

/// Identifier for a training job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJobId(pub String);

impl TrainingJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TrainingJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything the orchestrator needs to produce one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJobSpec {
    pub job_id: TrainingJobId,
    pub created_at: DateTime<Utc>,
    pub dataset: DatasetSource,
    #[serde(default)]
    pub columns: Columns,
    /// Number of shuffle splits (`k`).
    pub folds: usize,
    /// Held-out fraction per split; `0` trains once on every row.
    pub test_size: f64,
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default)]
    pub vectorizer: VectorizerKind,
    #[serde(default)]
    pub seed: u64,
}

impl TrainingJobSpec {
    #[must_use]
    pub fn new(dataset: DatasetSource) -> Self {
        Self {
            job_id: TrainingJobId::new(),
            created_at: Utc::now(),
            dataset,
            columns: Columns::default(),
            folds: 1,
            test_size: 0.0,
            algorithm: Algorithm::default(),
            vectorizer: VectorizerKind::default(),
            seed: DEFAULT_SEED,
        }
    }

    #[must_use]
    pub fn with_columns(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.columns = Columns { x: x.into(), y: y.into() };
        self
    }

    #[must_use]
    pub fn with_validation(mut self, folds: usize, test_size: f64) -> Self {
        self.folds = folds;
        self.test_size = test_size;
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, algorithm: Algorithm, vectorizer: VectorizerKind) -> Self {
        self.algorithm = algorithm;
        self.vectorizer = vectorizer;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if !(self.test_size.is_finite() && (0.0..1.0).contains(&self.test_size)) {
            return Err(TrainingError::invalid(
                "test_size",
                format!("must be at least 0.0 and less than 1.0, got {}", self.test_size),
            ));
        }
        if self.folds < 1 {
            return Err(TrainingError::invalid("folds", "number of folds must be greater than 0"));
        }
        validate_columns(&self.columns)
    }
}

/// Scoring an existing artifact without retraining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSpec {
    pub dataset: DatasetSource,
    pub artifact: ArtifactRef,
    #[serde(default)]
    pub columns: Columns,
    /// Held-out fraction; `1` evaluates every row.
    pub size: f64,
    #[serde(default)]
    pub seed: u64,
}

impl ValidationSpec {
    #[must_use]
    pub fn new(dataset: DatasetSource, artifact: ArtifactRef) -> Self {
        Self { dataset, artifact, columns: Columns::default(), size: 0.2, seed: DEFAULT_SEED }
    }

    #[must_use]
    pub fn with_columns(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.columns = Columns { x: x.into(), y: y.into() };
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if !(self.size.is_finite() && self.size > 0.0 && self.size <= 1.0) {
            return Err(TrainingError::invalid(
                "size",
                format!("the test size must be greater than 0.0 and not greater than 1.0, got {}", self.size),
            ));
        }
        validate_columns(&self.columns)
    }
}

fn validate_columns(columns: &Columns) -> TrainingResult<()> {
    if columns.x.trim().is_empty() {
        return Err(TrainingError::invalid("x", "feature column name is required"));
    }
    if columns.y.trim().is_empty() {
        return Err(TrainingError::invalid("y", "label column name is required"));
    }
    Ok(())
}
