//! Exploratory summaries of the cleaned data

use crate::data::Frame;
use crate::error::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BAR_WIDTH: usize = 40;

/// Location and spread of one numeric column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericSummary {
    pub name: String,
    pub mean: f64,
    pub sd: f64,
    pub min: f64,
    pub max: f64,
    /// Mean among tsunami events
    pub mean_tsunami: f64,
    /// Mean among non-tsunami events
    pub mean_no_tsunami: f64,
}

/// Pearson correlations between numeric predictors and the outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    /// Correlation of every column with the outcome, strongest first
    pub fn with_outcome(&self) -> Vec<(String, f64)> {
        let last = self.names.len().saturating_sub(1);
        let mut pairs: Vec<(String, f64)> = (0..last)
            .map(|j| (self.names[j].clone(), self.values[[j, last]]))
            .collect();
        pairs.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pairs
    }

    /// Write the square matrix with a header row and a name column
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec![String::new()];
        header.extend(self.names.iter().cloned());
        writer.write_record(&header)?;

        for (i, name) in self.names.iter().enumerate() {
            let mut record = vec![name.clone()];
            record.extend(self.values.row(i).iter().map(|v| format!("{:.6}", v)));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreSummary {
    pub n_rows: usize,
    /// (no tsunami, tsunami)
    pub class_counts: (usize, usize),
    pub numeric: Vec<NumericSummary>,
    /// Level counts per nominal column; missing values count as `NA`
    pub nominal: Vec<(String, Vec<(String, usize)>)>,
    pub correlation: CorrelationMatrix,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_sd(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64).sqrt()
}

/// Pearson correlation; zero when either side is constant
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va < 1e-12 || vb < 1e-12 {
        0.0
    } else {
        cov / (va.sqrt() * vb.sqrt())
    }
}

impl ExploreSummary {
    pub fn from_frame(frame: &Frame) -> Self {
        let [negatives, positives] = frame.class_indices();

        let numeric = frame
            .numeric_names
            .iter()
            .zip(&frame.numeric)
            .map(|(name, col)| {
                let pick = |rows: &[usize]| rows.iter().map(|&i| col[i]).collect::<Vec<f64>>();
                NumericSummary {
                    name: name.clone(),
                    mean: mean(col),
                    sd: sample_sd(col),
                    min: col.iter().copied().fold(f64::INFINITY, f64::min),
                    max: col.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    mean_tsunami: mean(&pick(&positives)),
                    mean_no_tsunami: mean(&pick(&negatives)),
                }
            })
            .collect();

        let nominal = frame
            .nominal_names
            .iter()
            .map(|name| {
                let counts = frame
                    .level_counts(name)
                    .into_iter()
                    .map(|(level, n)| (level.unwrap_or_else(|| "NA".to_string()), n))
                    .collect();
                (name.clone(), counts)
            })
            .collect();

        let mut names = frame.numeric_names.clone();
        names.push("tsunami".to_string());
        let mut columns: Vec<&[f64]> = frame.numeric.iter().map(|c| c.as_slice()).collect();
        columns.push(&frame.outcome);
        let k = columns.len();
        let values = Array2::from_shape_fn((k, k), |(i, j)| {
            if i == j {
                1.0
            } else {
                pearson(columns[i], columns[j])
            }
        });

        Self {
            n_rows: frame.n_rows(),
            class_counts: frame.class_counts(),
            numeric,
            nominal,
            correlation: CorrelationMatrix { names, values },
        }
    }

    /// Plain-text report with bar charts
    pub fn render(&self) -> String {
        let mut s = String::new();
        let (neg, pos) = self.class_counts;
        let total = self.n_rows.max(1) as f64;

        s.push_str(&format!("Earthquakes: {}\n\nOutcome balance\n", self.n_rows));
        for (label, n) in [("no tsunami", neg), ("tsunami", pos)] {
            let share = n as f64 / total;
            let bar = "█".repeat((share * BAR_WIDTH as f64).round() as usize);
            s.push_str(&format!("  {:<11} {:>5} ({:>5.1}%) {}\n", label, n, share * 100.0, bar));
        }

        s.push_str("\nNumeric predictors\n");
        s.push_str(&format!(
            "  {:<10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>12}\n",
            "column", "mean", "sd", "min", "max", "mean|tsu=1", "mean|tsu=0"
        ));
        for n in &self.numeric {
            s.push_str(&format!(
                "  {:<10} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>12.3} {:>12.3}\n",
                n.name, n.mean, n.sd, n.min, n.max, n.mean_tsunami, n.mean_no_tsunami
            ));
        }

        for (name, levels) in &self.nominal {
            s.push_str(&format!("\nLevels of {}\n", name));
            let max = levels.iter().map(|(_, n)| *n).max().unwrap_or(1).max(1);
            for (level, n) in levels {
                let bar = "█".repeat(n * BAR_WIDTH / max);
                s.push_str(&format!("  {:<10} {:>5} {}\n", level, n, bar));
            }
        }

        s.push_str("\nCorrelation with tsunami\n");
        for (name, r) in self.correlation.with_outcome() {
            let bar = "█".repeat((r.abs() * BAR_WIDTH as f64).round() as usize);
            s.push_str(&format!("  {:<10} {:>+7.3} {}\n", name, r, bar));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn frame() -> Frame {
        Frame {
            numeric_names: vec!["magnitude".into(), "depth".into()],
            numeric: vec![vec![6.5, 7.0, 7.5, 8.0], vec![10.0, 10.0, 10.0, 10.0]],
            nominal_names: vec!["alert".into()],
            nominal: vec![vec![Some("green".into()), None, Some("green".into()), Some("red".into())]],
            outcome: vec![0.0, 0.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_pearson() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0, 1.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_summary() {
        let summary = ExploreSummary::from_frame(&frame());
        assert_eq!(summary.class_counts, (2, 2));
        assert!((summary.numeric[0].mean - 7.25).abs() < 1e-12);
        assert!((summary.numeric[0].mean_tsunami - 7.75).abs() < 1e-12);
        assert_eq!(summary.numeric[1].sd, 0.0);

        let levels = &summary.nominal[0].1;
        assert!(levels.contains(&("NA".to_string(), 1)));
        assert!(levels.contains(&("green".to_string(), 2)));

        let top = summary.correlation.with_outcome();
        assert_eq!(top[0].0, "magnitude");
        assert_eq!(top[1].1, 0.0);
        assert!(summary.render().contains("Correlation with tsunami"));
    }

    #[test]
    fn test_correlation_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corr.csv");
        let summary = ExploreSummary::from_frame(&frame());
        summary.correlation.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], ",magnitude,depth,tsunami");
        assert!(lines[3].starts_with("tsunami,"));
    }
}
