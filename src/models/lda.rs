//! Linear discriminant analysis
//!
//! Two-class LDA with a pooled within-class covariance. The discriminant is
//! `x . w + b` with `w = S^-1 (mu1 - mu0)`, and the posterior follows from the
//! logistic of that score.

use super::{check_columns, check_training_data, sigmoid, Classifier};
use crate::error::{Result, RiskError};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Axis};

/// Ridge added to the covariance diagonal when it is not invertible
const RIDGE: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct LinearDiscriminant {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// Class means, negative class first
    pub means: Option<[Array1<f64>; 2]>,
}

impl LinearDiscriminant {
    pub fn new() -> Self {
        Self::default()
    }

    fn class_mean(x: &Array2<f64>, rows: &[usize]) -> Array1<f64> {
        x.select(Axis(0), rows)
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()))
    }

    /// Pooled within-class covariance with `n - 2` degrees of freedom
    fn pooled_covariance(x: &Array2<f64>, groups: &[Vec<usize>; 2], means: &[Array1<f64>; 2]) -> DMatrix<f64> {
        let p = x.ncols();
        let mut cov = DMatrix::<f64>::zeros(p, p);
        for (rows, mean) in groups.iter().zip(means.iter()) {
            for &i in rows {
                let centered = DVector::from_iterator(p, x.row(i).iter().zip(mean.iter()).map(|(a, m)| a - m));
                cov += &centered * centered.transpose();
            }
        }
        let dof = (x.nrows() as f64 - 2.0).max(1.0);
        cov / dof
    }

    fn invert(cov: DMatrix<f64>) -> Result<DMatrix<f64>> {
        let p = cov.nrows();
        if let Some(inv) = cov.clone().try_inverse() {
            return Ok(inv);
        }
        tracing::warn!("pooled covariance is singular, adding ridge");
        let mut ridge = RIDGE;
        for _ in 0..12 {
            let regularized = &cov + DMatrix::<f64>::identity(p, p) * ridge;
            if let Some(inv) = regularized.try_inverse() {
                return Ok(inv);
            }
            ridge *= 10.0;
        }
        Err(RiskError::SingularMatrix(format!(
            "pooled covariance of {} features",
            p
        )))
    }
}

impl Classifier for LinearDiscriminant {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;

        let mut groups: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for (i, &label) in y.iter().enumerate() {
            groups[usize::from(label >= 0.5)].push(i);
        }
        if groups[0].is_empty() || groups[1].is_empty() {
            let present = if groups[0].is_empty() { 1.0 } else { 0.0 };
            return Err(RiskError::SingleClass(present));
        }

        let means = [
            Self::class_mean(x, &groups[0]),
            Self::class_mean(x, &groups[1]),
        ];
        let inverse = Self::invert(Self::pooled_covariance(x, &groups, &means))?;

        let p = x.ncols();
        let diff = DVector::from_iterator(p, means[1].iter().zip(means[0].iter()).map(|(a, b)| a - b));
        let w = &inverse * diff;
        let weights = Array1::from_iter(w.iter().copied());

        let midpoint = (&means[0] + &means[1]) * 0.5;
        let prior_log_ratio = (groups[1].len() as f64 / groups[0].len() as f64).ln();
        let intercept = -midpoint.dot(&weights) + prior_log_ratio;

        tracing::debug!(n_features = p, intercept, "fitted linear discriminant");

        self.coefficients = Some(weights);
        self.intercept = Some(intercept);
        self.means = Some(means);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let weights = self.coefficients.as_ref().ok_or(RiskError::NotFitted)?;
        let intercept = self.intercept.ok_or(RiskError::NotFitted)?;
        check_columns(weights.len(), x)?;

        Ok((x.dot(weights) + intercept).mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_data::{accuracy, blobs};
    use ndarray::array;

    #[test]
    fn test_lda_separates_blobs() {
        let (x, y) = blobs(30, 3, 3.0, 5);
        let mut lda = LinearDiscriminant::new();
        lda.fit(&x, &y).unwrap();

        let pred = lda.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.95);
    }

    #[test]
    fn test_balanced_midpoint_is_even_odds() {
        let x = array![[0.0], [1.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut lda = LinearDiscriminant::new();
        lda.fit(&x, &y).unwrap();

        let p = lda.predict_proba(&array![[2.0]]).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_columns_fall_back_to_ridge() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut lda = LinearDiscriminant::new();
        lda.fit(&x, &y).unwrap();

        let p = lda.predict_proba(&x).unwrap();
        assert!(p[0] < 0.5 && p[3] > 0.5);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[0.0], [1.0]];
        let y = array![1.0, 1.0];
        let mut lda = LinearDiscriminant::new();
        assert!(matches!(lda.fit(&x, &y), Err(RiskError::SingleClass(_))));
    }
}
