//! Cross-validated model selection.
//!
//! With a zero test size the pipeline is fit once on every row and no metrics
//! are produced. Otherwise `folds` seeded shuffle splits are evaluated, each
//! with a freshly built estimator, and one of them is kept:
//!
//! - the first split always becomes the current best;
//! - a later split replaces it only when its F1 **and** its accuracy are both
//!   strictly higher. Improving one metric while matching or losing on the
//!   other is not enough.

use crate::artifacts::{TrainedArtifact, TrainingManifest};
use crate::dataset::{compute_dataset_id, load_dataset, LabeledDataset};
use crate::error::{TrainingError, TrainingResult};
use crate::job::TrainingJobSpec;
use crate::metrics::{score, Scores};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::split::ShuffleSplit;
use crate::trainer::{Estimator, Pipeline};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scores of one evaluated split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    pub index: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub scores: Scores,
}

/// Result of [`train_model`]. `accuracy` and `f1` are `None` exactly when the
/// job used no held-out split.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: TrainedArtifact,
    pub accuracy: Option<f64>,
    pub f1: Option<f64>,
    pub splits: Vec<SplitReport>,
    pub selected_split: Option<usize>,
}

/// Running best under the conjunctive improvement rule.
#[derive(Debug)]
pub struct BestFit<E> {
    current: Option<(usize, E, Scores)>,
}

impl<E> Default for BestFit<E> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<E> BestFit<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate; returns whether it became the best.
    pub fn offer(&mut self, index: usize, candidate: E, scores: Scores) -> bool {
        let improves = match &self.current {
            None => true,
            Some((_, _, best)) => scores.f1 > best.f1 && scores.accuracy > best.accuracy,
        };
        if improves {
            self.current = Some((index, candidate, scores));
        }
        improves
    }

    #[must_use]
    pub fn best_index(&self) -> Option<usize> {
        self.current.as_ref().map(|(i, _, _)| *i)
    }

    #[must_use]
    pub fn into_best(self) -> Option<(usize, E, Scores)> {
        self.current
    }
}

/// Outcome of [`cross_validate`].
#[derive(Debug)]
pub struct CrossValidation<E> {
    pub best: E,
    pub best_index: usize,
    pub scores: Scores,
    pub reports: Vec<SplitReport>,
}

/// Run `folds` shuffle splits over `dataset`, building a new estimator for
/// each with `make`. `on_split` sees every report together with whether it is
/// the best so far.
pub fn cross_validate<E, F>(
    dataset: &LabeledDataset,
    folds: usize,
    test_size: f64,
    seed: u64,
    mut make: F,
    mut on_split: impl FnMut(&SplitReport, bool),
) -> TrainingResult<CrossValidation<E>>
where
    E: Estimator,
    F: FnMut() -> E,
{
    if folds < 1 {
        return Err(TrainingError::invalid("folds", "number of folds must be greater than 0"));
    }
    let splitter = ShuffleSplit::new(dataset.len(), test_size, folds, seed)?;
    let mut best = BestFit::new();
    let mut reports = Vec::with_capacity(folds);

    for (index, split) in splitter.enumerate() {
        let train = dataset.select(&split.train);
        let test = dataset.select(&split.test);

        let mut estimator = make();
        estimator.fit(&train.texts, &train.labels)?;
        let outputs = estimator.predict(&test.texts)?;
        let scores = score(estimator.output_kind(), &outputs, &test.labels)?;

        let report = SplitReport { index, train_rows: train.len(), test_rows: test.len(), scores };
        let became_best = best.offer(index, estimator, scores);
        debug!(split = index, accuracy = scores.accuracy, f1 = scores.f1, became_best, "Scored split");
        on_split(&report, became_best);
        reports.push(report);
    }

    let (best_index, best, scores) = best
        .into_best()
        .ok_or_else(|| TrainingError::Estimator("no split was evaluated".to_string()))?;
    Ok(CrossValidation { best, best_index, scores, reports })
}

/// Train the pipeline described by `job` and return the selected artifact.
pub fn train_model(job: &TrainingJobSpec, progress: &dyn ProgressSink) -> TrainingResult<TrainingOutcome> {
    job.validate()?;
    let dataset = load_dataset(&job.dataset, &job.columns)?;
    let dataset_id = compute_dataset_id(&dataset);
    let make = || Pipeline::new(job.algorithm, job.vectorizer);

    let splits = if job.test_size == 0.0 { 1 } else { job.folds };
    progress.on_event(ProgressEvent::Started { job_id: job.job_id.clone(), rows: dataset.len(), splits });

    let (pipeline, metrics, reports, selected_split) = if job.test_size == 0.0 {
        let mut pipeline = make();
        pipeline.fit(&dataset.texts, &dataset.labels)?;
        (pipeline, None, Vec::new(), None)
    } else {
        let cv = cross_validate(&dataset, job.folds, job.test_size, job.seed, make, |report, best| {
            progress.on_event(ProgressEvent::Split {
                job_id: job.job_id.clone(),
                index: report.index,
                total: job.folds,
                scores: report.scores,
                best,
            });
        })?;
        (cv.best, Some(cv.scores), cv.reports, Some(cv.best_index))
    };

    progress.on_event(ProgressEvent::Finished { job_id: job.job_id.clone(), metrics });

    let manifest = TrainingManifest {
        job_id: job.job_id.clone(),
        created_at: Utc::now(),
        algorithm: job.algorithm,
        vectorizer: job.vectorizer,
        dataset_id,
        rows: dataset.len(),
        metrics,
    };
    let artifact = TrainedArtifact::new(manifest, pipeline)?;

    Ok(TrainingOutcome {
        artifact,
        accuracy: metrics.map(|m| m.accuracy),
        f1: metrics.map(|m| m.f1),
        splits: reports,
        selected_split,
    })
}
