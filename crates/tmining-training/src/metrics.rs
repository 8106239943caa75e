//! Scoring shared by the orchestrator and the evaluator.

use crate::capability::OutputKind;
use crate::dataset::Label;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};

/// The class counted as positive for F1.
pub const POSITIVE_LABEL: Label = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub accuracy: f64,
    pub f1: f64,
}

/// Read raw estimator outputs as labels. Regressor outputs are rounded to the
/// nearest integer label, halves to even; classifier outputs are already labels.
#[must_use]
pub fn to_labels(kind: OutputKind, outputs: &[f64]) -> Vec<Label> {
    outputs
        .iter()
        .map(|&v| match kind {
            OutputKind::Regressor => v.round_ties_even() as Label,
            OutputKind::Classifier => v as Label,
        })
        .collect()
}

pub fn score(kind: OutputKind, outputs: &[f64], truth: &[Label]) -> TrainingResult<Scores> {
    if outputs.len() != truth.len() {
        return Err(TrainingError::Estimator(format!(
            "{} predictions for {} labels",
            outputs.len(),
            truth.len()
        )));
    }
    let predicted = to_labels(kind, outputs);
    Ok(Scores { accuracy: accuracy(&predicted, truth), f1: binary_f1(&predicted, truth) })
}

/// Fraction of exact matches; `0.0` for empty input.
#[must_use]
pub fn accuracy(predicted: &[Label], truth: &[Label]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    hits as f64 / truth.len() as f64
}

/// F1 of [`POSITIVE_LABEL`] against every other label. Zero when there are no
/// true positives (including the degenerate no-positives case).
#[must_use]
pub fn binary_f1(predicted: &[Label], truth: &[Label]) -> f64 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&p, &t) in predicted.iter().zip(truth) {
        match (p == POSITIVE_LABEL, t == POSITIVE_LABEL) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }
    if tp == 0 {
        return 0.0;
    }
    (2 * tp) as f64 / (2 * tp + fp + fn_) as f64
}
