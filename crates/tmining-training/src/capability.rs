//! Registered learning capabilities.
//!
//! Callers name an algorithm and a vectorizer once, at the boundary; the rest
//! of the crate works with these enums.

use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether an estimator emits class labels or a continuous score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Classifier,
    Regressor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Multinomial naive Bayes.
    NaiveBayes,
    /// Averaged multi-class perceptron (linear classifier).
    Perceptron,
    /// L2-regularized least squares on the label value.
    Ridge,
}

impl Algorithm {
    pub const ALL: [Self; 3] = [Self::NaiveBayes, Self::Perceptron, Self::Ridge];

    #[must_use]
    pub fn output_kind(self) -> OutputKind {
        match self {
            Self::NaiveBayes | Self::Perceptron => OutputKind::Classifier,
            Self::Ridge => OutputKind::Regressor,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NaiveBayes => "naive_bayes",
            Self::Perceptron => "perceptron",
            Self::Ridge => "ridge",
        }
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Perceptron
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = TrainingError;

    fn from_str(s: &str) -> TrainingResult<Self> {
        match normalize(s).as_str() {
            "naivebayes" | "nb" | "multinomialnb" => Ok(Self::NaiveBayes),
            "perceptron" | "svc" | "linearsvc" => Ok(Self::Perceptron),
            "ridge" | "svr" | "linearregression" => Ok(Self::Ridge),
            _ => Err(TrainingError::invalid(
                "algorithm",
                format!(
                    "unknown algorithm `{s}` (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorizerKind {
    /// Raw term counts.
    Count,
    /// Term counts weighted by smoothed inverse document frequency, L2-normalized.
    Tfidf,
}

impl VectorizerKind {
    pub const ALL: [Self; 2] = [Self::Count, Self::Tfidf];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Tfidf => "tfidf",
        }
    }
}

impl Default for VectorizerKind {
    fn default() -> Self {
        Self::Tfidf
    }
}

impl fmt::Display for VectorizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VectorizerKind {
    type Err = TrainingError;

    fn from_str(s: &str) -> TrainingResult<Self> {
        match normalize(s).as_str() {
            "count" | "countvectorizer" => Ok(Self::Count),
            "tfidf" | "tfidfvectorizer" => Ok(Self::Tfidf),
            _ => Err(TrainingError::invalid(
                "vectorizer",
                format!(
                    "unknown vectorizer `{s}` (expected one of: {})",
                    Self::ALL.map(Self::as_str).join(", ")
                ),
            )),
        }
    }
}

fn normalize(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).map(|c| c.to_ascii_lowercase()).collect()
}
