//! Built-in learners operating on sparse feature vectors.

use crate::capability::Algorithm;
use crate::dataset::Label;
use crate::error::{TrainingError, TrainingResult};
use crate::vectorizer::{l2_normalize, SparseVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const PERCEPTRON_EPOCHS: usize = 10;
const RIDGE_ITERATIONS: usize = 200;
const RIDGE_LEARNING_RATE: f64 = 0.2;
const RIDGE_ALPHA: f64 = 1e-3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum FittedModel {
    NaiveBayes(NaiveBayes),
    Perceptron(Perceptron),
    Ridge(Ridge),
}

impl FittedModel {
    pub fn fit(
        algorithm: Algorithm,
        rows: &[SparseVector],
        labels: &[Label],
        n_features: usize,
    ) -> TrainingResult<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(TrainingError::Estimator(format!(
                "cannot fit on {} rows with {} labels",
                rows.len(),
                labels.len()
            )));
        }
        Ok(match algorithm {
            Algorithm::NaiveBayes => Self::NaiveBayes(NaiveBayes::fit(rows, labels, n_features)),
            Algorithm::Perceptron => Self::Perceptron(Perceptron::fit(rows, labels, n_features)),
            Algorithm::Ridge => Self::Ridge(Ridge::fit(rows, labels, n_features)),
        })
    }

    /// Weight shapes must agree with the class list and `n_features`.
    pub fn check(&self, n_features: usize) -> TrainingResult<()> {
        match self {
            Self::NaiveBayes(m) => {
                check_classes(&m.classes)?;
                if m.log_prior.len() != m.classes.len() || m.feature_log_prob.len() != m.classes.len() {
                    return Err(shape_error("naive bayes class tables"));
                }
                check_widths(&m.feature_log_prob, n_features, "naive bayes feature table")
            }
            Self::Perceptron(m) => {
                check_classes(&m.classes)?;
                if m.weights.len() != m.classes.len() {
                    return Err(shape_error("perceptron class weights"));
                }
                check_widths(&m.weights, n_features + 1, "perceptron weights")
            }
            Self::Ridge(m) => check_widths(std::slice::from_ref(&m.weights), n_features, "ridge weights"),
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::NaiveBayes(_) => Algorithm::NaiveBayes,
            Self::Perceptron(_) => Algorithm::Perceptron,
            Self::Ridge(_) => Algorithm::Ridge,
        }
    }

    /// Class label for classifiers, continuous score for regressors.
    #[must_use]
    pub fn predict(&self, row: &SparseVector) -> f64 {
        match self {
            Self::NaiveBayes(m) => m.predict(row) as f64,
            Self::Perceptron(m) => m.predict(row) as f64,
            Self::Ridge(m) => m.predict(row),
        }
    }
}

fn shape_error(what: &str) -> TrainingError {
    TrainingError::Artifact(format!("{what} do not match the fitted classes"))
}

fn check_classes(classes: &[Label]) -> TrainingResult<()> {
    if classes.is_empty() {
        return Err(TrainingError::Artifact("model has no classes".to_string()));
    }
    Ok(())
}

fn check_widths(rows: &[Vec<f64>], width: usize, what: &str) -> TrainingResult<()> {
    match rows.iter().find(|r| r.len() != width) {
        Some(row) => Err(TrainingError::Artifact(format!("{what} have width {} but expected {width}", row.len()))),
        None => Ok(()),
    }
}

fn sorted_classes(labels: &[Label]) -> Vec<Label> {
    labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

fn dot(weights: &[f64], row: &SparseVector) -> f64 {
    row.iter().map(|&(i, v)| weights.get(i).copied().unwrap_or(0.0) * v).sum()
}

/// Highest score wins; ties go to the smaller class label.
fn argmax(classes: &[Label], scores: impl Iterator<Item = f64>) -> Label {
    let mut best = (classes.first().copied().unwrap_or_default(), f64::NEG_INFINITY);
    for (class, score) in classes.iter().zip(scores) {
        if score > best.1 {
            best = (*class, score);
        }
    }
    best.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayes {
    classes: Vec<Label>,
    log_prior: Vec<f64>,
    /// `feature_log_prob[c][f]`, Laplace smoothed.
    feature_log_prob: Vec<Vec<f64>>,
}

impl NaiveBayes {
    fn fit(rows: &[SparseVector], labels: &[Label], n_features: usize) -> Self {
        let classes = sorted_classes(labels);
        let mut class_count = vec![0.0; classes.len()];
        let mut feature_count = vec![vec![0.0; n_features]; classes.len()];

        for (row, label) in rows.iter().zip(labels) {
            let c = classes.binary_search(label).unwrap_or_default();
            class_count[c] += 1.0;
            for &(i, v) in row {
                if i < n_features {
                    feature_count[c][i] += v;
                }
            }
        }

        let total = rows.len() as f64;
        let log_prior = class_count.iter().map(|n| (n / total).ln()).collect();
        let feature_log_prob = feature_count
            .iter()
            .map(|counts| {
                let denom = counts.iter().sum::<f64>() + n_features as f64;
                counts.iter().map(|n| ((n + 1.0) / denom).ln()).collect()
            })
            .collect();

        Self { classes, log_prior, feature_log_prob }
    }

    fn predict(&self, row: &SparseVector) -> Label {
        let scores = self
            .log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, probs)| prior + dot(probs, row));
        argmax(&self.classes, scores)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perceptron {
    classes: Vec<Label>,
    /// Averaged weights per class; the last slot of each row is the bias.
    weights: Vec<Vec<f64>>,
}

impl Perceptron {
    fn fit(rows: &[SparseVector], labels: &[Label], n_features: usize) -> Self {
        let classes = sorted_classes(labels);
        let width = n_features + 1;
        let mut weights = vec![vec![0.0; width]; classes.len()];
        // Accumulates step-weighted updates for the averaging trick.
        let mut accumulated = vec![vec![0.0; width]; classes.len()];
        let mut step = 1.0;

        for _ in 0..PERCEPTRON_EPOCHS {
            for (row, label) in rows.iter().zip(labels) {
                let truth = classes.binary_search(label).unwrap_or_default();
                let guess = Self::best_index(&weights, row, n_features);
                if guess != truth {
                    for (sign, c) in [(1.0, truth), (-1.0, guess)] {
                        for &(i, v) in row {
                            if i < n_features {
                                weights[c][i] += sign * v;
                                accumulated[c][i] += sign * step * v;
                            }
                        }
                        weights[c][n_features] += sign;
                        accumulated[c][n_features] += sign * step;
                    }
                }
                step += 1.0;
            }
        }

        let averaged = weights
            .iter()
            .zip(&accumulated)
            .map(|(w, u)| w.iter().zip(u).map(|(w, u)| w - u / step).collect())
            .collect();

        Self { classes, weights: averaged }
    }

    fn best_index(weights: &[Vec<f64>], row: &SparseVector, bias: usize) -> usize {
        let mut best = (0, f64::NEG_INFINITY);
        for (c, w) in weights.iter().enumerate() {
            let score = dot(w, row) + w.get(bias).copied().unwrap_or(0.0);
            if score > best.1 {
                best = (c, score);
            }
        }
        best.0
    }

    fn predict(&self, row: &SparseVector) -> Label {
        let bias = self.weights.first().map_or(0, |w| w.len().saturating_sub(1));
        let scores = self
            .weights
            .iter()
            .map(|w| dot(w.get(..bias).unwrap_or(w), row) + w.get(bias).copied().unwrap_or(0.0));
        argmax(&self.classes, scores)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ridge {
    weights: Vec<f64>,
    bias: f64,
}

impl Ridge {
    fn fit(rows: &[SparseVector], labels: &[Label], n_features: usize) -> Self {
        let rows: Vec<SparseVector> = rows
            .iter()
            .map(|r| {
                let mut r = r.clone();
                l2_normalize(&mut r);
                r
            })
            .collect();
        let n = rows.len() as f64;
        let mut weights = vec![0.0; n_features];
        let mut bias = labels.iter().map(|&y| y as f64).sum::<f64>() / n;

        for _ in 0..RIDGE_ITERATIONS {
            let mut grad = vec![0.0; n_features];
            let mut grad_bias = 0.0;
            for (row, &y) in rows.iter().zip(labels) {
                let residual = dot(&weights, row) + bias - y as f64;
                for &(i, v) in row {
                    if i < n_features {
                        grad[i] += 2.0 * residual * v / n;
                    }
                }
                grad_bias += 2.0 * residual / n;
            }
            for (w, g) in weights.iter_mut().zip(&grad) {
                *w -= RIDGE_LEARNING_RATE * (g + 2.0 * RIDGE_ALPHA * *w);
            }
            bias -= RIDGE_LEARNING_RATE * grad_bias;
        }

        Self { weights, bias }
    }

    fn predict(&self, row: &SparseVector) -> f64 {
        let mut row = row.clone();
        l2_normalize(&mut row);
        dot(&self.weights, &row) + self.bias
    }
}
