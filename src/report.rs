//! Model comparison report and file exports

use crate::error::Result;
use crate::tuning::TuneResults;
use crate::workflow::ModelEvaluation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const BAR_WIDTH: usize = 40;

/// Everything produced by one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub n_train: usize,
    pub n_test: usize,
    pub evaluations: Vec<ModelEvaluation>,
    pub tuning: Vec<TuneResults>,
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

impl Report {
    pub fn new(n_train: usize, n_test: usize, evaluations: Vec<ModelEvaluation>, tuning: Vec<TuneResults>) -> Self {
        Self {
            generated_at: Utc::now(),
            n_train,
            n_test,
            evaluations,
            tuning,
        }
    }

    /// Evaluations ordered by test AUC, best first
    pub fn ranked(&self) -> Vec<&ModelEvaluation> {
        let mut ranked: Vec<&ModelEvaluation> = self.evaluations.iter().collect();
        ranked.sort_by(|a, b| {
            b.test_auc
                .unwrap_or(f64::NEG_INFINITY)
                .partial_cmp(&a.test_auc.unwrap_or(f64::NEG_INFINITY))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    pub fn best(&self) -> Option<&ModelEvaluation> {
        self.ranked().into_iter().next()
    }

    pub fn comparison_table(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "{:<30} {:>16} {:>9} {:>9}  {}\n",
            "Model", "CV AUC (± SE)", "Test AUC", "Accuracy", "Parameters"
        ));
        s.push_str(&format!("{}\n", "-".repeat(100)));
        for e in self.ranked() {
            let cv = match (e.cv_auc, e.cv_std_err) {
                (Some(m), Some(se)) => format!("{:.4} ± {:.4}", m, se),
                (Some(m), None) => format!("{:.4}", m),
                _ => "n/a".to_string(),
            };
            s.push_str(&format!(
                "{:<30} {:>16} {:>9} {:>9.4}  {}\n",
                e.kind.label(),
                cv,
                fmt_opt(e.test_auc),
                e.metrics.accuracy,
                e.params.describe()
            ));
        }
        s
    }

    /// Horizontal bars of test AUC
    pub fn auc_chart(&self) -> String {
        let mut s = String::new();
        for e in self.ranked() {
            let auc = e.test_auc.unwrap_or(0.0);
            let bar = "█".repeat((auc * BAR_WIDTH as f64).round() as usize);
            s.push_str(&format!("{:<14} {} {}\n", e.kind.name(), bar, fmt_opt(e.test_auc)));
        }
        s
    }

    pub fn confusion_matrices(&self) -> String {
        let mut s = String::new();
        for e in self.ranked() {
            s.push_str(&format!("{}\n", e.kind.label()));
            s.push_str(&e.metrics.confusion_matrix.display());
            s.push('\n');
        }
        s
    }

    pub fn render(&self) -> String {
        let mut s = format!(
            "Tsunami risk model comparison ({} training rows, {} test rows)\n\n",
            self.n_train, self.n_test
        );
        s.push_str(&self.comparison_table());
        s.push_str("\nTest AUC\n");
        s.push_str(&self.auc_chart());
        s.push_str("\nConfusion matrices (test set)\n");
        s.push_str(&self.confusion_matrices());

        for e in &self.evaluations {
            if let Some(importance) = &e.feature_importance {
                s.push_str(&format!("\n{} feature importance\n", e.kind.label()));
                s.push_str(&importance_chart(importance));
            }
        }
        s
    }

    /// Write every export under `dir` and return the written paths
    pub fn export<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        let json_path = dir.join("report.json");
        std::fs::write(&json_path, serde_json::to_string_pretty(self)?)?;
        written.push(json_path);

        let roc_path = dir.join("roc_curves.csv");
        let mut writer = csv::Writer::from_path(&roc_path)?;
        writer.write_record(["model", "threshold", "fpr", "tpr"])?;
        for e in &self.evaluations {
            for p in &e.roc.points {
                writer.write_record([
                    e.kind.name().to_string(),
                    p.threshold.to_string(),
                    p.fpr.to_string(),
                    p.tpr.to_string(),
                ])?;
            }
        }
        writer.flush()?;
        written.push(roc_path);

        let cm_path = dir.join("confusion_matrices.csv");
        let mut writer = csv::Writer::from_path(&cm_path)?;
        writer.write_record(["model", "tn", "fp", "fn", "tp"])?;
        for e in &self.evaluations {
            let cm = e.metrics.confusion_matrix;
            writer.write_record([
                e.kind.name().to_string(),
                cm.tn.to_string(),
                cm.fp.to_string(),
                cm.fn_.to_string(),
                cm.tp.to_string(),
            ])?;
        }
        writer.flush()?;
        written.push(cm_path);

        for results in &self.tuning {
            let path = dir.join(format!("tuning_{}.csv", results.kind.name()));
            write_tuning_csv(results, &path)?;
            written.push(path);
        }

        for e in &self.evaluations {
            if let Some(importance) = &e.feature_importance {
                let path = dir.join(format!("importance_{}.csv", e.kind.name()));
                let mut writer = csv::Writer::from_path(&path)?;
                writer.write_record(["feature", "importance"])?;
                for (name, value) in importance {
                    writer.write_record([name.clone(), value.to_string()])?;
                }
                writer.flush()?;
                written.push(path);
            }
        }

        info!("Wrote {} report files to {:?}", written.len(), dir);
        Ok(written)
    }
}

fn importance_chart(importance: &[(String, f64)]) -> String {
    let max = importance.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let mut s = String::new();
    for (name, value) in importance {
        let len = if max > 0.0 {
            (value / max * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        s.push_str(&format!("  {:<14} {:>6.3} {}\n", name, value, "█".repeat(len)));
    }
    s
}

/// One row per candidate: parameters, mean AUC, standard error, folds
pub fn write_tuning_csv<P: AsRef<Path>>(results: &TuneResults, path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["model", "params", "mean_auc", "std_err", "n_folds"])?;
    for c in &results.candidates {
        writer.write_record([
            results.kind.name().to_string(),
            c.params.describe(),
            c.mean_auc.map_or_else(String::new, |m| m.to_string()),
            c.std_err.to_string(),
            c.n_folds.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Top candidates of a search as a text table
pub fn format_best(results: &TuneResults, n: usize) -> String {
    let mut s = format!(
        "Best {} candidates for {} ({} folds)\n",
        n,
        results.kind.label(),
        results.n_folds
    );
    s.push_str(&format!("{:>4} {:>8} {:>8} {:>6}  {}\n", "rank", "mean", "std_err", "folds", "parameters"));
    for (rank, c) in results.show_best(n).iter().enumerate() {
        s.push_str(&format!(
            "{:>4} {:>8} {:>8.4} {:>6}  {}\n",
            rank + 1,
            fmt_opt(c.mean_auc),
            c.std_err,
            c.n_folds,
            c.params.describe()
        ));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{ClassificationMetrics, RocCurve};
    use crate::models::{Hyperparameters, ModelKind};
    use crate::tuning::CandidateResult;
    use ndarray::array;
    use tempfile::tempdir;

    fn evaluation(kind: ModelKind, params: Hyperparameters, proba: ndarray::Array1<f64>) -> ModelEvaluation {
        let truth = array![0.0, 0.0, 1.0, 1.0];
        let pred = proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
        let metrics = ClassificationMetrics::calculate_with_proba(&truth, &pred, Some(&proba));
        ModelEvaluation {
            kind,
            params,
            cv_auc: Some(0.9),
            cv_std_err: Some(0.01),
            test_auc: metrics.auc_roc,
            roc: RocCurve::compute(&truth, &proba),
            metrics,
            feature_importance: None,
        }
    }

    fn report() -> Report {
        let good = evaluation(ModelKind::Lda, Hyperparameters::Lda, array![0.1, 0.2, 0.8, 0.9]);
        let weak = evaluation(
            ModelKind::SvmLinear,
            Hyperparameters::SvmLinear { cost: 1.0 },
            array![0.6, 0.2, 0.4, 0.9],
        );
        let tuning = TuneResults {
            kind: ModelKind::SvmLinear,
            candidates: vec![CandidateResult::new(Hyperparameters::SvmLinear { cost: 1.0 }, vec![0.8, 0.9])],
            n_folds: 2,
        };
        Report::new(12, 4, vec![weak, good], vec![tuning])
    }

    #[test]
    fn test_ranking_by_test_auc() {
        let report = report();
        assert_eq!(report.best().unwrap().kind, ModelKind::Lda);
        let table = report.comparison_table();
        let lda_pos = table.find("Linear discriminant").unwrap();
        let svm_pos = table.find("Linear SVM").unwrap();
        assert!(lda_pos < svm_pos);
        assert!(report.render().contains("Confusion matrices"));
    }

    #[test]
    fn test_export_files() {
        let dir = tempdir().unwrap();
        let written = report().export(dir.path()).unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"report.json".to_string()));
        assert!(names.contains(&"tuning_svm_linear.csv".to_string()));

        let roc = std::fs::read_to_string(dir.path().join("roc_curves.csv")).unwrap();
        assert!(roc.starts_with("model,threshold,fpr,tpr"));
        assert!(roc.contains("lda,inf,0,0"));

        let cm = std::fs::read_to_string(dir.path().join("confusion_matrices.csv")).unwrap();
        assert!(cm.contains("lda,2,0,0,2"));
    }

    #[test]
    fn test_format_best() {
        let report = report();
        let text = format_best(&report.tuning[0], 3);
        assert!(text.contains("cost=1.0000"));
        assert!(text.contains("0.8500"));
    }
}
