//! Bag-of-words feature extraction.

use crate::capability::VectorizerKind;
use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sparse feature vector: `(feature index, value)` pairs sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

/// Lowercased runs of at least two word characters.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vectorizer {
    kind: VectorizerKind,
    vocabulary: BTreeMap<String, usize>,
    /// Per-feature idf weights; empty for `Count`.
    #[serde(default)]
    idf: Vec<f64>,
}

impl Vectorizer {
    #[must_use]
    pub fn new(kind: VectorizerKind) -> Self {
        Self { kind, vocabulary: BTreeMap::new(), idf: Vec::new() }
    }

    #[must_use]
    pub fn kind(&self) -> VectorizerKind {
        self.kind
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn fit(&mut self, texts: &[String]) -> TrainingResult<()> {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for text in texts {
            let unique: BTreeSet<String> = tokenize(text).collect();
            for token in unique {
                *document_frequency.entry(token).or_default() += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(TrainingError::Estimator(
                "empty vocabulary; documents contain no tokens".to_string(),
            ));
        }

        // BTreeMap iteration is sorted, so indices follow token order.
        self.vocabulary =
            document_frequency.keys().enumerate().map(|(i, t)| (t.clone(), i)).collect();

        self.idf = match self.kind {
            VectorizerKind::Count => Vec::new(),
            VectorizerKind::Tfidf => {
                let n = texts.len() as f64;
                document_frequency.values().map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0).collect()
            }
        };
        Ok(())
    }

    pub fn transform(&self, texts: &[String]) -> TrainingResult<Vec<SparseVector>> {
        if self.vocabulary.is_empty() {
            return Err(TrainingError::Estimator("vectorizer used before fit".to_string()));
        }
        Ok(texts.iter().map(|t| self.transform_one(t)).collect())
    }

    /// Fitted state must be self-consistent: indices dense over the
    /// vocabulary and one idf weight per feature for tf-idf.
    pub fn check(&self) -> TrainingResult<()> {
        let n = self.vocabulary.len();
        if n == 0 {
            return Err(TrainingError::Artifact("vectorizer vocabulary is empty".to_string()));
        }
        let indices: BTreeSet<usize> = self.vocabulary.values().copied().collect();
        if indices.len() != n || indices.last().is_some_and(|&max| max >= n) {
            return Err(TrainingError::Artifact("vectorizer vocabulary indices are not dense".to_string()));
        }
        let expected_idf = match self.kind {
            VectorizerKind::Count => 0,
            VectorizerKind::Tfidf => n,
        };
        if self.idf.len() != expected_idf {
            return Err(TrainingError::Artifact(format!(
                "vectorizer has {} idf weights for {expected_idf} features",
                self.idf.len()
            )));
        }
        Ok(())
    }

    fn transform_one(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_default() += 1.0;
            }
        }

        let mut vector: SparseVector = counts.into_iter().collect();
        if self.kind == VectorizerKind::Tfidf {
            for (idx, value) in &mut vector {
                *value *= self.idf.get(*idx).copied().unwrap_or(0.0);
            }
            l2_normalize(&mut vector);
        }
        vector
    }
}

pub(crate) fn l2_normalize(vector: &mut SparseVector) {
    let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, v) in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_short_tokens() {
        let tokens: Vec<String> = tokenize("A Quick, brown-fox! x").collect();
        assert_eq!(tokens, vec!["quick", "brown", "fox"]);
    }

    #[test]
    fn test_count_vectorizer_counts_terms() {
        let mut v = Vectorizer::new(VectorizerKind::Count);
        v.fit(&docs(&["red red blue", "blue green"])).unwrap();
        assert_eq!(v.n_features(), 3);

        // Vocabulary is sorted: blue=0, green=1, red=2.
        let out = v.transform(&docs(&["red red purple"])).unwrap();
        assert_eq!(out[0], vec![(2, 2.0)]);
    }

    #[test]
    fn test_tfidf_rows_are_unit_length() {
        let mut v = Vectorizer::new(VectorizerKind::Tfidf);
        let corpus = docs(&["alpha beta", "alpha gamma", "delta"]);
        v.fit(&corpus).unwrap();
        for row in v.transform(&corpus).unwrap() {
            let norm: f64 = row.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_check_rejects_missing_idf_weights() {
        let mut v = Vectorizer::new(VectorizerKind::Tfidf);
        v.fit(&docs(&["alpha beta", "beta gamma"])).unwrap();
        assert!(v.check().is_ok());

        v.idf.clear();
        assert!(matches!(v.check(), Err(TrainingError::Artifact(_))));
        // Transform stays total even on inconsistent state.
        assert_eq!(v.transform(&docs(&["alpha"])).unwrap()[0], vec![(0, 0.0)]);
    }

    #[test]
    fn test_fit_rejects_tokenless_corpus() {
        let mut v = Vectorizer::new(VectorizerKind::Count);
        assert!(v.fit(&docs(&["a", "!"])).is_err());
    }
}
