//! Linear Yield Model Training
//!
//! Fits ordinary least squares on the one-hot design matrix by solving the
//! normal equations `(X'X + λI) β = X'y`.

use crate::engine::PredictionEngine;
use crate::metrics::RegressionMetrics;
use crate::model::{LinearYieldModel, ModelArtifact};
use crate::InferenceError;
use data_cleaner::CanonicalTable;
use feature_engine::OneHotEncoder;
use ndarray::{concatenate, s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Shuffle seed
    pub seed: u64,
    /// Diagonal added to X'X
    pub ridge: f64,
    /// Drop the first level of each categorical dimension
    pub drop_first: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            ridge: 1e-8,
            drop_first: true,
        }
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub feature_count: usize,
    pub base_year: Option<i32>,
    /// Held-out metrics, or training metrics when nothing was held out
    pub metrics: RegressionMetrics,
}

/// Trains [`LinearYieldModel`]s from cleaned tables
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Fit a model and its descriptor on `table`
    pub fn train(
        &self,
        table: &CanonicalTable,
    ) -> Result<(ModelArtifact, TrainingReport), InferenceError> {
        let encoder = OneHotEncoder::new(self.config.drop_first);
        let (aligner, encoded) = encoder.fit_encode(table)?;

        let (train_idx, test_idx) = self.split(table.len());
        info!(
            "Training on {} rows, holding out {} ({} features)",
            train_idx.len(),
            test_idx.len(),
            encoded.feature_names.len()
        );

        let x_train = encoded.features.select(Axis(0), &train_idx);
        let y_train = encoded.target.select(Axis(0), &train_idx);
        let (intercept, coefficients) = fit_ols(&x_train, &y_train, self.config.ridge)?;

        let model = LinearYieldModel::new(encoded.feature_names.clone(), coefficients.to_vec(), intercept)?;
        let artifact = ModelArtifact::new(model, aligner.descriptor().clone())?;

        let eval_idx = if test_idx.is_empty() { &train_idx } else { &test_idx };
        let x_eval = encoded.features.select(Axis(0), eval_idx);
        let y_eval = encoded.target.select(Axis(0), eval_idx);
        let predicted = x_eval.dot(&coefficients) + intercept;
        let metrics = RegressionMetrics::calculate(&y_eval.to_vec(), &predicted.to_vec());

        info!(
            "Model evaluation: RMSE={:.2}, MAE={:.2}, R2={:.3}",
            metrics.rmse, metrics.mae, metrics.r2
        );

        let report = TrainingReport {
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            feature_count: encoded.feature_names.len(),
            base_year: artifact.descriptor.base_year(),
            metrics,
        };
        Ok((artifact, report))
    }

    /// Train and wrap the result in a ready engine
    pub fn train_engine(
        &self,
        table: &CanonicalTable,
    ) -> Result<(PredictionEngine, TrainingReport), InferenceError> {
        let (artifact, report) = self.train(table)?;
        let engine = PredictionEngine::new(Arc::new(artifact.model), artifact.descriptor)?;
        Ok((engine, report))
    }

    /// Seeded shuffle split into (train, test) row indices
    fn split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        let fraction = self.config.test_fraction.clamp(0.0, 1.0);
        let n_test = ((n as f64) * fraction).round() as usize;
        let n_test = n_test.min(n.saturating_sub(1));

        let test = indices.split_off(n - n_test);
        (indices, test)
    }
}

/// Least squares with intercept; returns (intercept, coefficients)
fn fit_ols(
    x: &Array2<f64>,
    y: &Array1<f64>,
    ridge: f64,
) -> Result<(f64, Array1<f64>), InferenceError> {
    if x.nrows() != y.len() {
        return Err(InferenceError::InvalidInputShape {
            expected: format!("{} targets", x.nrows()),
            actual: format!("{} targets", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(InferenceError::TrainingFailed("no training rows".to_string()));
    }

    let ones = Array2::<f64>::ones((x.nrows(), 1));
    let design = concatenate(Axis(1), &[ones.view(), x.view()])
        .map_err(|e| InferenceError::TrainingFailed(e.to_string()))?;

    let xt = design.t();
    let mut xtx = xt.dot(&design);
    for i in 0..xtx.nrows() {
        xtx[[i, i]] += ridge;
    }
    let xty = xt.dot(y);

    let beta = solve(xtx, xty)
        .ok_or_else(|| InferenceError::TrainingFailed("normal equations are singular".to_string()))?;
    debug!("Fitted coefficients: {:?}", beta);

    Ok((beta[0], beta.slice(s![1..]).to_owned()))
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }

        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * x[k]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Some(x)
}
