//! Recipe + model bundles and the final train/test evaluation

use crate::data::{Frame, Split};
use crate::error::Result;
use crate::metrics::{ClassificationMetrics, RocCurve};
use crate::models::{Classifier, Hyperparameters, ModelKind};
use crate::recipe::{PreparedRecipe, Recipe};
use crate::tuning::CandidateResult;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::info;

/// An unfitted preprocessing recipe paired with a model configuration
#[derive(Debug, Clone)]
pub struct Workflow {
    recipe: Recipe,
    params: Hyperparameters,
    seed: u64,
}

impl Workflow {
    pub fn new(recipe: Recipe, params: Hyperparameters, seed: u64) -> Self {
        Self {
            recipe,
            params,
            seed,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.params.kind()
    }

    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    /// Prep the recipe on `frame`, then fit the model on the baked rows
    pub fn fit(&self, frame: &Frame) -> Result<FittedWorkflow> {
        let prepared = self.recipe.prep(frame)?;
        let design = prepared.bake(frame)?;
        let mut model = self.params.build(self.seed);
        model.fit(&design.x, &design.y)?;

        Ok(FittedWorkflow {
            params: self.params.clone(),
            prepared,
            model,
        })
    }
}

/// A workflow whose recipe and model are both estimated
pub struct FittedWorkflow {
    params: Hyperparameters,
    prepared: PreparedRecipe,
    model: Box<dyn Classifier>,
}

impl FittedWorkflow {
    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    pub fn feature_names(&self) -> &[String] {
        self.prepared.feature_names()
    }

    /// P(tsunami) for each row of `frame`
    pub fn predict_proba(&self, frame: &Frame) -> Result<Array1<f64>> {
        let design = self.prepared.bake(frame)?;
        self.model.predict_proba(&design.x)
    }

    pub fn predict(&self, frame: &Frame) -> Result<Array1<f64>> {
        let design = self.prepared.bake(frame)?;
        self.model.predict(&design.x)
    }

    /// Named importances, largest first, for models that track them
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        let values = self.model.feature_importances()?;
        let mut named: Vec<(String, f64)> = self
            .feature_names()
            .iter()
            .cloned()
            .zip(values)
            .collect();
        named.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Some(named)
    }
}

/// Test-set performance of one finalized model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub kind: ModelKind,
    pub params: Hyperparameters,
    /// Mean cross-validated AUC of the selected candidate
    pub cv_auc: Option<f64>,
    pub cv_std_err: Option<f64>,
    pub test_auc: Option<f64>,
    pub metrics: ClassificationMetrics,
    pub roc: RocCurve,
    /// Random forest only
    pub feature_importance: Option<Vec<(String, f64)>>,
}

impl ModelEvaluation {
    /// Attach the resampling estimate that selected these parameters
    pub fn with_resampling(mut self, candidate: &CandidateResult) -> Self {
        self.cv_auc = candidate.mean_auc;
        self.cv_std_err = Some(candidate.std_err);
        self
    }
}

/// Fit on the training rows and evaluate once on the held-out test rows
pub fn last_fit(workflow: &Workflow, split: &Split) -> Result<(FittedWorkflow, ModelEvaluation)> {
    let fitted = workflow.fit(&split.train)?;

    let proba = fitted.predict_proba(&split.test)?;
    let pred = proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
    let truth = Array1::from_vec(split.test.outcome.clone());

    let metrics = ClassificationMetrics::calculate_with_proba(&truth, &pred, Some(&proba));
    let roc = RocCurve::compute(&truth, &proba);
    let feature_importance = match workflow.kind() {
        ModelKind::RandomForest => fitted.feature_importances(),
        _ => None,
    };

    info!(
        model = workflow.kind().name(),
        test_auc = ?metrics.auc_roc,
        accuracy = metrics.accuracy,
        "last fit"
    );

    let evaluation = ModelEvaluation {
        kind: workflow.kind(),
        params: workflow.params().clone(),
        cv_auc: None,
        cv_std_err: None,
        test_auc: metrics.auc_roc,
        metrics,
        roc,
        feature_importance,
    };
    Ok((fitted, evaluation))
}
