//! tmining training
//!
//! Text-classification training primitives for:
//! - Loading labeled CSV datasets (`load_dataset`)
//! - Cross-validated model selection (`train_model`)
//! - Scoring and querying trained artifacts (`validate_model`, `predict`)
//! - Storing artifact blobs on disk (`ArtifactLayout`)

pub mod artifacts;
pub mod capability;
pub mod dataset;
pub mod error;
pub mod estimators;
pub mod evaluator;
pub mod job;
pub mod layout;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod split;
pub mod trainer;
pub mod vectorizer;

pub use artifacts::{ArtifactRef, TrainedArtifact, TrainingManifest};
pub use capability::{Algorithm, OutputKind, VectorizerKind};
pub use dataset::{load_dataset, Columns, DatasetId, DatasetSource, Label, LabeledDataset};
pub use error::{TrainingError, TrainingResult};
pub use evaluator::{predict, predict_with, validate_model, Evaluation};
pub use job::{TrainingJobId, TrainingJobSpec, ValidationSpec, DEFAULT_SEED};
pub use layout::ArtifactLayout;
pub use metrics::{Scores, POSITIVE_LABEL};
pub use orchestrator::{cross_validate, train_model, BestFit, CrossValidation, SplitReport, TrainingOutcome};
pub use progress::{ProgressEvent, ProgressSink, StdoutProgressSink, TracingProgressSink};
pub use trainer::{Estimator, Pipeline};
