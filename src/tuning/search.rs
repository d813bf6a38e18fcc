//! Cross-validated grid search scored by ROC AUC

use super::cache::TuneCache;
use crate::data::{Fold, Frame};
use crate::error::{Result, RiskError};
use crate::metrics::roc_auc;
use crate::models::{Hyperparameters, ModelKind};
use crate::recipe::{Design, Recipe};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Resampled performance of one grid candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: Hyperparameters,
    /// AUC on each assessment set that contained both classes
    pub fold_aucs: Vec<f64>,
    /// `None` when no fold could be scored
    pub mean_auc: Option<f64>,
    /// Standard error of the fold AUCs
    pub std_err: f64,
    pub n_folds: usize,
}

impl CandidateResult {
    pub fn new(params: Hyperparameters, fold_aucs: Vec<f64>) -> Self {
        let n = fold_aucs.len();
        let mean_auc = (n > 0).then(|| fold_aucs.iter().sum::<f64>() / n as f64);
        let std_err = match mean_auc {
            Some(mean) if n > 1 => {
                let var = fold_aucs.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                (var / n as f64).sqrt()
            }
            _ => 0.0,
        };
        Self {
            params,
            fold_aucs,
            mean_auc,
            std_err,
            n_folds: n,
        }
    }
}

/// All candidates of one model, in grid order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuneResults {
    pub kind: ModelKind,
    pub candidates: Vec<CandidateResult>,
    /// Folds requested, including any that could not be scored
    pub n_folds: usize,
}

impl TuneResults {
    /// Top `n` candidates by mean AUC; grid order breaks ties
    pub fn show_best(&self, n: usize) -> Vec<&CandidateResult> {
        let mut scored: Vec<&CandidateResult> =
            self.candidates.iter().filter(|c| c.mean_auc.is_some()).collect();
        scored.sort_by(|a, b| {
            b.mean_auc
                .partial_cmp(&a.mean_auc)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(n);
        scored
    }

    /// Highest mean AUC, first candidate on ties
    pub fn select_best(&self) -> Result<&CandidateResult> {
        let mut best: Option<(&CandidateResult, f64)> = None;
        for candidate in &self.candidates {
            let Some(mean) = candidate.mean_auc else {
                continue;
            };
            if best.map_or(true, |(_, b)| mean > b) {
                best = Some((candidate, mean));
            }
        }
        best.map(|(c, _)| c).ok_or_else(|| {
            RiskError::EmptyData(format!("no scorable candidate for {}", self.kind))
        })
    }
}

/// Grid search over resampling folds
#[derive(Debug, Clone)]
pub struct GridSearch {
    recipe: Recipe,
    seed: u64,
    show_progress: bool,
}

impl GridSearch {
    pub fn new(recipe: Recipe, seed: u64) -> Self {
        Self {
            recipe,
            seed,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn progress_bar(&self, len: usize, kind: ModelKind) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg:>14} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(kind.name());
        pb
    }

    /// Prep the recipe on each analysis set and bake both halves of the fold
    fn bake_folds(&self, frame: &Frame, folds: &[Fold]) -> Result<Vec<(Design, Design)>> {
        folds
            .par_iter()
            .map(|fold| -> Result<(Design, Design)> {
                let analysis = frame.subset(&fold.analysis);
                let assessment = frame.subset(&fold.assessment);
                let prepared = self.recipe.prep(&analysis)?;
                Ok((prepared.bake(&analysis)?, prepared.bake(&assessment)?))
            })
            .collect()
    }

    /// Evaluate every candidate on every fold
    pub fn run(
        &self,
        kind: ModelKind,
        candidates: &[Hyperparameters],
        frame: &Frame,
        folds: &[Fold],
    ) -> Result<TuneResults> {
        if candidates.is_empty() {
            return Err(RiskError::InvalidParameter(format!(
                "empty parameter grid for {}",
                kind
            )));
        }
        if let Some(other) = candidates.iter().find(|c| c.kind() != kind) {
            return Err(RiskError::InvalidParameter(format!(
                "candidate {} does not belong to {}",
                other, kind
            )));
        }
        if folds.is_empty() {
            return Err(RiskError::InvalidParameter("no resampling folds".to_string()));
        }

        info!(
            model = kind.name(),
            candidates = candidates.len(),
            folds = folds.len(),
            "tuning"
        );
        let designs = self.bake_folds(frame, folds)?;
        let pb = self.progress_bar(candidates.len(), kind);

        let results = candidates
            .par_iter()
            .map(|params| -> Result<CandidateResult> {
                let mut aucs = Vec::with_capacity(designs.len());
                for (fold, (train, test)) in folds.iter().zip(designs.iter()) {
                    let mut model = params.build(self.seed);
                    model.fit(&train.x, &train.y)?;
                    let proba = model.predict_proba(&test.x)?;
                    match roc_auc(&test.y, &proba) {
                        Some(auc) => aucs.push(auc),
                        None => warn!(fold = fold.id, "fold has one class or non-finite scores, skipped"),
                    }
                }
                let result = CandidateResult::new(params.clone(), aucs);
                debug!(params = %params, mean_auc = ?result.mean_auc, std_err = result.std_err, "candidate scored");
                pb.inc(1);
                Ok(result)
            })
            .collect::<Result<Vec<_>>>()?;

        pb.finish_and_clear();

        Ok(TuneResults {
            kind,
            candidates: results,
            n_folds: folds.len(),
        })
    }

    /// Like [`GridSearch::run`], reusing cached results when the inputs match
    pub fn run_cached(
        &self,
        kind: ModelKind,
        candidates: &[Hyperparameters],
        frame: &Frame,
        folds: &[Fold],
        cache: Option<&TuneCache>,
    ) -> Result<TuneResults> {
        let Some(cache) = cache else {
            return self.run(kind, candidates, frame, folds);
        };

        let fingerprint = TuneCache::fingerprint(kind, candidates, self.recipe, frame, folds, self.seed)?;
        if let Some(results) = cache.load(kind, &fingerprint) {
            info!(model = kind.name(), "using cached tuning results");
            return Ok(results);
        }

        let results = self.run(kind, candidates, frame, folds)?;
        let path = cache.store(&results, &fingerprint)?;
        debug!(path = %path.display(), "cached tuning results");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vfold_cv;

    fn separable_frame(n: usize) -> Frame {
        let mut frame = Frame {
            numeric_names: vec!["magnitude".to_string(), "depth".to_string()],
            numeric: vec![Vec::new(), Vec::new()],
            ..Default::default()
        };
        for i in 0..n {
            let positive = i % 3 == 0;
            let jitter = (i % 7) as f64 * 0.1;
            frame.numeric[0].push((if positive { 7.5 } else { 6.5 }) + jitter);
            frame.numeric[1].push((if positive { 10.0 } else { 60.0 }) - jitter * 10.0);
            frame.outcome.push(if positive { 1.0 } else { 0.0 });
        }
        frame
    }

    #[test]
    fn test_candidate_statistics() {
        let c = CandidateResult::new(Hyperparameters::Lda, vec![0.8, 0.9, 1.0]);
        assert!((c.mean_auc.unwrap() - 0.9).abs() < 1e-12);
        assert!((c.std_err - 0.1 / 3f64.sqrt()).abs() < 1e-12);

        let empty = CandidateResult::new(Hyperparameters::Lda, vec![]);
        assert!(empty.mean_auc.is_none());
    }

    #[test]
    fn test_select_best_prefers_first_on_ties() {
        let results = TuneResults {
            kind: ModelKind::SvmLinear,
            candidates: vec![
                CandidateResult::new(Hyperparameters::SvmLinear { cost: 0.1 }, vec![0.7]),
                CandidateResult::new(Hyperparameters::SvmLinear { cost: 1.0 }, vec![0.9]),
                CandidateResult::new(Hyperparameters::SvmLinear { cost: 10.0 }, vec![0.9]),
                CandidateResult::new(Hyperparameters::SvmLinear { cost: 100.0 }, vec![]),
            ],
            n_folds: 1,
        };
        assert_eq!(
            results.select_best().unwrap().params,
            Hyperparameters::SvmLinear { cost: 1.0 }
        );

        let top = results.show_best(5);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].params, Hyperparameters::SvmLinear { cost: 1.0 });
        assert_eq!(top[2].params, Hyperparameters::SvmLinear { cost: 0.1 });
    }

    #[test]
    fn test_grid_search_scores_every_candidate() {
        let frame = separable_frame(60);
        let folds = vfold_cv(&frame, 3, 1).unwrap();
        let candidates = vec![
            Hyperparameters::Knn { neighbors: 3, weight_func: crate::models::WeightFunc::Rectangular },
            Hyperparameters::Knn { neighbors: 5, weight_func: crate::models::WeightFunc::Inverse },
        ];

        let search = GridSearch::new(Recipe::default(), 42).with_progress(false);
        let results = search.run(ModelKind::Knn, &candidates, &frame, &folds).unwrap();

        assert_eq!(results.candidates.len(), 2);
        for c in &results.candidates {
            assert_eq!(c.n_folds, 3);
            assert!(c.mean_auc.unwrap() > 0.9);
        }
    }

    #[test]
    fn test_same_seed_same_results() {
        let frame = separable_frame(45);
        let folds = vfold_cv(&frame, 3, 9).unwrap();
        let candidates = vec![Hyperparameters::RandomForest { mtry: 1, min_n: 2, trees: 10 }];
        let search = GridSearch::new(Recipe::default(), 3).with_progress(false);

        let a = search.run(ModelKind::RandomForest, &candidates, &frame, &folds).unwrap();
        let b = search.run(ModelKind::RandomForest, &candidates, &frame, &folds).unwrap();
        assert_eq!(a.candidates[0].fold_aucs, b.candidates[0].fold_aucs);
    }

    #[test]
    fn test_single_class_folds_are_skipped() {
        // Two positives in twenty rows leave three of five folds without one
        let mut frame = Frame {
            numeric_names: vec!["magnitude".to_string(), "depth".to_string()],
            numeric: vec![Vec::new(), Vec::new()],
            ..Default::default()
        };
        for i in 0..20 {
            let positive = i == 4 || i == 13;
            let jitter = (i % 7) as f64 * 0.1;
            frame.numeric[0].push(if positive { 8.0 + jitter } else { 6.5 + jitter });
            frame.numeric[1].push(if positive { 10.0 } else { 60.0 - jitter * 10.0 });
            frame.outcome.push(if positive { 1.0 } else { 0.0 });
        }
        let folds = vfold_cv(&frame, 5, 3).unwrap();
        let with_positive = folds
            .iter()
            .filter(|f| f.assessment.iter().any(|&i| frame.outcome[i] > 0.5))
            .count();

        let search = GridSearch::new(Recipe::default(), 1).with_progress(false);
        let results = search.run(ModelKind::Lda, &[Hyperparameters::Lda], &frame, &folds).unwrap();

        assert_eq!(results.n_folds, 5);
        let lda = &results.candidates[0];
        assert_eq!(lda.n_folds, with_positive);
        assert!(lda.n_folds < 5);
        assert!(lda.mean_auc.unwrap() > 0.9);
    }

    #[test]
    fn test_mismatched_candidate_rejected() {
        let frame = separable_frame(30);
        let folds = vfold_cv(&frame, 3, 1).unwrap();
        let search = GridSearch::new(Recipe::default(), 1).with_progress(false);
        let err = search.run(ModelKind::Knn, &[Hyperparameters::Lda], &frame, &folds);
        assert!(matches!(err, Err(RiskError::InvalidParameter(_))));
    }
}
