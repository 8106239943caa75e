use crate::job::TrainingJobId;
use crate::metrics::Scores;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { job_id: TrainingJobId, rows: usize, splits: usize },
    Split { job_id: TrainingJobId, index: usize, total: usize, scores: Scores, best: bool },
    Finished { job_id: TrainingJobId, metrics: Option<Scores> },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Forwards progress to `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { job_id, rows, splits } => {
                info!(%job_id, rows, splits, "Training started");
            }
            ProgressEvent::Split { job_id, index, total, scores, best } => {
                info!(
                    %job_id,
                    split = index + 1,
                    total,
                    accuracy = scores.accuracy,
                    f1 = scores.f1,
                    best,
                    "Split evaluated"
                );
            }
            ProgressEvent::Finished { job_id, metrics } => match metrics {
                Some(m) => info!(%job_id, accuracy = m.accuracy, f1 = m.f1, "Training finished"),
                None => info!(%job_id, "Training finished without held-out metrics"),
            },
        }
    }
}

/// Human-readable progress for terminals.
#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { job_id, rows, splits } => {
                println!("[train:{job_id}] started on {rows} rows ({splits} split(s))");
            }
            ProgressEvent::Split { job_id, index, total, scores, best } => {
                let marker = if best { " *" } else { "" };
                println!(
                    "[train:{job_id}] split {}/{total} accuracy {:.4} f1 {:.4}{marker}",
                    index + 1,
                    scores.accuracy,
                    scores.f1
                );
            }
            ProgressEvent::Finished { job_id, .. } => println!("[train:{job_id}] finished"),
        }
    }
}
