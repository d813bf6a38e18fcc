//! End-to-end run: load, clean, split, tune, finalize, report

use crate::config::Config;
use crate::data::{initial_split, vfold_cv, Cleaner, DataLoader, Fold, Frame, Split};
use crate::error::Result;
use crate::models::ModelKind;
use crate::recipe::Recipe;
use crate::report::Report;
use crate::tuning::{GridSearch, TuneCache, TuneResults};
use crate::workflow::{last_fit, Workflow};
use std::path::Path;
use tracing::info;

/// Training/test split plus the folds drawn from the training rows
#[derive(Debug, Clone)]
pub struct Resamples {
    pub split: Split,
    pub folds: Vec<Fold>,
}

pub struct Pipeline {
    config: Config,
    recipe: Recipe,
    show_progress: bool,
    use_cache: bool,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let use_cache = config.output.use_cache;
        Self {
            config,
            recipe: Recipe::default(),
            show_progress: true,
            use_cache,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read the CSV and apply the cleaning rules
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Frame> {
        let table = DataLoader::load_table(path)?;
        Cleaner::new(self.config.data.clone()).clean(&table)
    }

    pub fn resample(&self, frame: &Frame) -> Result<Resamples> {
        let split = initial_split(frame, self.config.split.prop, self.config.split.seed)?;
        let folds = vfold_cv(&split.train, self.config.split.folds, self.config.split.seed)?;
        let (train_neg, train_pos) = split.train.class_counts();
        let (test_neg, test_pos) = split.test.class_counts();
        info!(
            train = split.train.n_rows(),
            train_pos,
            train_neg,
            test = split.test.n_rows(),
            test_pos,
            test_neg,
            folds = folds.len(),
            "resampled"
        );
        Ok(Resamples { split, folds })
    }

    fn search(&self) -> GridSearch {
        GridSearch::new(self.recipe, self.config.split.seed).with_progress(self.show_progress)
    }

    /// Grid search for one model on the training folds
    pub fn tune(&self, kind: ModelKind, resamples: &Resamples) -> Result<TuneResults> {
        let candidates = self.config.grids.candidates(kind);
        let cache = self
            .use_cache
            .then(|| TuneCache::new(&self.config.output.cache_dir));
        self.search().run_cached(
            kind,
            &candidates,
            &resamples.split.train,
            &resamples.folds,
            cache.as_ref(),
        )
    }

    /// Tune each model, refit the best candidate on all training rows and
    /// score it once on the test rows
    pub fn run(&self, frame: &Frame, kinds: &[ModelKind]) -> Result<Report> {
        let resamples = self.resample(frame)?;
        let mut evaluations = Vec::with_capacity(kinds.len());
        let mut tuning = Vec::with_capacity(kinds.len());

        for &kind in kinds {
            let results = self.tune(kind, &resamples)?;
            let best = results.select_best()?;
            info!(
                model = kind.name(),
                params = %best.params.describe(),
                cv_auc = ?best.mean_auc,
                "selected"
            );

            let workflow = Workflow::new(self.recipe, best.params.clone(), self.config.split.seed);
            let (_, evaluation) = last_fit(&workflow, &resamples.split)?;
            evaluations.push(evaluation.with_resampling(best));
            tuning.push(results);
        }

        Ok(Report::new(
            resamples.split.train.n_rows(),
            resamples.split.test.n_rows(),
            evaluations,
            tuning,
        ))
    }
}
