//! Regression Metrics

use serde::{Deserialize, Serialize};

/// Goodness-of-fit for yield predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root mean squared error (tons/ha)
    pub rmse: f64,
    /// Mean absolute error (tons/ha)
    pub mae: f64,
    /// Coefficient of determination
    pub r2: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compare actual and predicted yields. Slices must be the same length.
    pub fn calculate(y_true: &[f64], y_pred: &[f64]) -> Self {
        debug_assert_eq!(y_true.len(), y_pred.len());
        let n = y_true.len();
        if n == 0 {
            return Self {
                rmse: 0.0,
                mae: 0.0,
                r2: 0.0,
                n_samples: 0,
            };
        }

        let nf = n as f64;
        let mean = y_true.iter().sum::<f64>() / nf;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        let mut abs_err = 0.0;
        for (&t, &p) in y_true.iter().zip(y_pred) {
            ss_res += (t - p).powi(2);
            ss_tot += (t - mean).powi(2);
            abs_err += (t - p).abs();
        }

        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            rmse: (ss_res / nf).sqrt(),
            mae: abs_err / nf,
            r2,
            n_samples: n,
        }
    }
}
