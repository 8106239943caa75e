//! Scoring and querying previously trained artifacts.

use crate::artifacts::{ArtifactRef, TrainedArtifact};
use crate::dataset::{load_dataset, Label};
use crate::error::{TrainingError, TrainingResult};
use crate::job::ValidationSpec;
use crate::metrics::{score, to_labels};
use crate::split::ShuffleSplit;
use crate::trainer::Estimator;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub f1: f64,
    /// Rows the artifact was scored on.
    pub evaluated_rows: usize,
}

/// Score an artifact on a dataset without retraining.
///
/// `size == 1` scores every row; any other size in `(0, 1)` scores the
/// held-out partition of one seeded shuffle split.
pub fn validate_model(spec: &ValidationSpec) -> TrainingResult<Evaluation> {
    let artifact = TrainedArtifact::load(&spec.artifact)?;
    spec.validate()?;
    let dataset = load_dataset(&spec.dataset, &spec.columns)?;

    let held_out = if spec.size >= 1.0 {
        dataset
    } else {
        let split = ShuffleSplit::new(dataset.len(), spec.size, 1, spec.seed)?
            .next()
            .ok_or_else(|| TrainingError::Estimator("shuffle split produced no partition".to_string()))?;
        dataset.select(&split.test)
    };

    let pipeline = &artifact.pipeline;
    let outputs = pipeline.predict(&held_out.texts)?;
    let scores = score(pipeline.output_kind(), &outputs, &held_out.labels)?;

    info!(
        job_id = %artifact.manifest.job_id,
        rows = held_out.len(),
        accuracy = scores.accuracy,
        f1 = scores.f1,
        "Validated artifact"
    );
    Ok(Evaluation { accuracy: scores.accuracy, f1: scores.f1, evaluated_rows: held_out.len() })
}

/// Predict the label of a single text.
pub fn predict(artifact: &ArtifactRef, text: &str) -> TrainingResult<Label> {
    let artifact = TrainedArtifact::load(artifact)?;
    predict_with(&artifact, text)
}

pub fn predict_with(artifact: &TrainedArtifact, text: &str) -> TrainingResult<Label> {
    if text.trim().is_empty() {
        return Err(TrainingError::invalid("text", "no text provided"));
    }
    let pipeline = &artifact.pipeline;
    let outputs = pipeline.predict(&[text.to_string()])?;
    to_labels(pipeline.output_kind(), &outputs)
        .into_iter()
        .next()
        .ok_or_else(|| TrainingError::Estimator("estimator returned no prediction".to_string()))
}
