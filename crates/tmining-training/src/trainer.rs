use crate::capability::{Algorithm, OutputKind, VectorizerKind};
use crate::dataset::Label;
use crate::error::{TrainingError, TrainingResult};
use crate::estimators::FittedModel;
use crate::vectorizer::Vectorizer;
use serde::{Deserialize, Serialize};

/// Fit/predict capability the orchestrator and evaluator drive.
///
/// `predict` returns one raw output per input: a class label for classifiers,
/// a continuous value for regressors. Scoring decides how to read it from
/// [`Estimator::output_kind`].
pub trait Estimator: Send {
    fn output_kind(&self) -> OutputKind;

    fn fit(&mut self, texts: &[String], labels: &[Label]) -> TrainingResult<()>;

    fn predict(&self, texts: &[String]) -> TrainingResult<Vec<f64>>;
}

/// A vectorizer chained with a learner; this is the trained artifact payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    algorithm: Algorithm,
    vectorizer: Vectorizer,
    model: Option<FittedModel>,
}

impl Pipeline {
    #[must_use]
    pub fn new(algorithm: Algorithm, vectorizer: VectorizerKind) -> Self {
        Self { algorithm, vectorizer: Vectorizer::new(vectorizer), model: None }
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn vectorizer_kind(&self) -> VectorizerKind {
        self.vectorizer.kind()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Verify a deserialized pipeline before it is used for prediction.
    pub fn check(&self) -> TrainingResult<()> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| TrainingError::Artifact("artifact pipeline is not fitted".to_string()))?;
        if model.algorithm() != self.algorithm {
            return Err(TrainingError::Artifact(format!(
                "pipeline declares {} but holds a {} model",
                self.algorithm,
                model.algorithm()
            )));
        }
        self.vectorizer.check()?;
        model.check(self.vectorizer.n_features())
    }
}

impl Estimator for Pipeline {
    fn output_kind(&self) -> OutputKind {
        self.algorithm.output_kind()
    }

    fn fit(&mut self, texts: &[String], labels: &[Label]) -> TrainingResult<()> {
        self.vectorizer.fit(texts)?;
        let rows = self.vectorizer.transform(texts)?;
        self.model =
            Some(FittedModel::fit(self.algorithm, &rows, labels, self.vectorizer.n_features())?);
        Ok(())
    }

    fn predict(&self, texts: &[String]) -> TrainingResult<Vec<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| TrainingError::Estimator("pipeline has not been fitted".to_string()))?;
        let rows = self.vectorizer.transform(texts)?;
        Ok(rows.iter().map(|r| model.predict(r)).collect())
    }
}
