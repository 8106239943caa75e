use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Stable identifier for a dataset (content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

/// Class label. Binary tasks use `1` as the positive class.
pub type Label = i64;

/// Where a CSV dataset comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatasetSource {
    /// CSV file on disk.
    Path { path: PathBuf },
    /// CSV bytes already in memory (e.g. an upload).
    Bytes { bytes: Vec<u8> },
}

impl DatasetSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path { path: path.into() }
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes { bytes: bytes.into() }
    }

    fn describe(&self) -> String {
        match self {
            Self::Path { path } => path.display().to_string(),
            Self::Bytes { bytes } => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

/// Feature and label column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    pub x: String,
    pub y: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self { x: "text".to_string(), y: "target".to_string() }
    }
}

/// Text features paired with integer labels, row-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledDataset {
    pub texts: Vec<String>,
    pub labels: Vec<Label>,
}

impl LabeledDataset {
    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Rows at `indices`, in that order.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            texts: indices.iter().map(|&i| self.texts[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Read the `x`/`y` columns of a CSV dataset.
pub fn load_dataset(source: &DatasetSource, columns: &Columns) -> TrainingResult<LabeledDataset> {
    let bytes = match source {
        DatasetSource::Path { path } => {
            if !path.is_file() {
                return Err(TrainingError::DatasetNotFound(path.display().to_string()));
            }
            std::fs::read(path)?
        }
        DatasetSource::Bytes { bytes } => bytes.clone(),
    };

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes.as_slice());
    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let (x_idx, y_idx) = match (position(&columns.x), position(&columns.y)) {
        (Some(x), Some(y)) => (x, y),
        (x, y) => {
            let mut missing = Vec::new();
            if x.is_none() {
                missing.push(columns.x.clone());
            }
            if y.is_none() {
                missing.push(columns.y.clone());
            }
            return Err(TrainingError::MissingColumn(missing));
        }
    };

    let mut dataset = LabeledDataset::default();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let text = record.get(x_idx).unwrap_or_default().to_string();
        let raw_label = record.get(y_idx).unwrap_or_default();
        let label = parse_label(raw_label).ok_or_else(|| {
            TrainingError::Dataset(format!(
                "row {}: label `{}` in column `{}` is not an integer class",
                row + 1,
                raw_label,
                columns.y
            ))
        })?;
        dataset.texts.push(text);
        dataset.labels.push(label);
    }

    if dataset.is_empty() {
        return Err(TrainingError::Dataset(format!("dataset {} has no rows", source.describe())));
    }

    tracing::debug!(rows = dataset.len(), source = %source.describe(), "Loaded dataset");
    Ok(dataset)
}

/// Accepts `1`, ` 0 `, `1.0`; rejects blanks and fractional values.
fn parse_label(raw: &str) -> Option<Label> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<Label>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    (v.is_finite() && v.fract() == 0.0).then(|| v as Label)
}

pub fn compute_dataset_id(dataset: &LabeledDataset) -> DatasetId {
    let mut hasher = Sha256::new();

    for (text, label) in dataset.texts.iter().zip(&dataset.labels) {
        hasher.update(text.as_bytes());
        hasher.update(b"\t");
        hasher.update(label.to_string().as_bytes());
        hasher.update(b"\n");
    }

    DatasetId(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_source(body: &str) -> DatasetSource {
        DatasetSource::bytes(body.as_bytes().to_vec())
    }

    #[test]
    fn test_load_dataset_reads_named_columns() {
        let source = csv_source("id,text,target\n1,good news,1\n2,bad news,0\n");
        let ds = load_dataset(&source, &Columns::default()).unwrap();
        assert_eq!(ds.texts, vec!["good news", "bad news"]);
        assert_eq!(ds.labels, vec![1, 0]);
    }

    #[test]
    fn test_load_dataset_reports_every_missing_column() {
        let source = csv_source("body,label\nhello,1\n");
        let err = load_dataset(&source, &Columns::default()).unwrap_err();
        match err {
            TrainingError::MissingColumn(cols) => assert_eq!(cols, vec!["text", "target"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_dataset_missing_file() {
        let err = load_dataset(&DatasetSource::path("does/not/exist.csv"), &Columns::default())
            .unwrap_err();
        assert!(matches!(err, TrainingError::DatasetNotFound(_)));
    }

    #[test]
    fn test_load_dataset_rejects_non_integer_labels() {
        let source = csv_source("text,target\nhello,maybe\n");
        assert!(matches!(
            load_dataset(&source, &Columns::default()),
            Err(TrainingError::Dataset(_))
        ));
    }

    #[test]
    fn test_parse_label_accepts_integral_floats() {
        assert_eq!(parse_label("1.0"), Some(1));
        assert_eq!(parse_label(" 0 "), Some(0));
        assert_eq!(parse_label("0.5"), None);
        assert_eq!(parse_label(""), None);
    }

    #[test]
    fn test_compute_dataset_id_stable_for_same_content() {
        let ds = LabeledDataset { texts: vec!["a".into(), "b".into()], labels: vec![1, 0] };
        assert_eq!(compute_dataset_id(&ds), compute_dataset_id(&ds.clone()));
        let other = LabeledDataset { texts: vec!["a".into(), "b".into()], labels: vec![0, 0] };
        assert_ne!(compute_dataset_id(&ds), compute_dataset_id(&other));
    }
}
