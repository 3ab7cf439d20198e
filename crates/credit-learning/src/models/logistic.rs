//! Logistic regression trained with batch gradient descent.

use super::{Classifier, LOGISTIC_REGRESSION, check_training_data, not_fitted};
use crate::config::LogisticParams;
use credit_processing::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use tracing::debug;

/// Probabilities are clamped this far from 0 and 1 inside the log loss.
const PROBA_EPS: f64 = 1e-15;

/// Binary logistic regression with an L2 penalty.
///
/// Features are standardised with the mean and standard deviation of the
/// training rows; the same transform is applied when scoring.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    params: LogisticParams,
    state: Option<FittedState>,
}

#[derive(Debug, Clone)]
struct FittedState {
    mean: Array1<f64>,
    scale: Array1<f64>,
    coefficients: Array1<f64>,
    intercept: f64,
    iterations: usize,
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self { params, state: None }
    }

    /// Coefficients on the standardised features, once fitted.
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.state.as_ref().map(|s| &s.coefficients)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.intercept)
    }

    /// Iterations run by the last fit.
    pub fn iterations(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.iterations)
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    fn log_loss(&self, probas: &Array1<f64>, y: &Array1<f64>, coefficients: &Array1<f64>) -> f64 {
        let n = y.len() as f64;
        let data_loss = probas
            .iter()
            .zip(y.iter())
            .map(|(&p, &t)| {
                let p = p.clamp(PROBA_EPS, 1.0 - PROBA_EPS);
                -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            })
            .sum::<f64>()
            / n;
        data_loss + 0.5 * self.params.l2_penalty * coefficients.dot(coefficients)
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticParams::default())
    }
}

/// Column means and standard deviations; constant columns get scale 1.
fn standardisation(x: &Array2<f64>) -> (Array1<f64>, Array1<f64>) {
    let n_features = x.ncols();
    let mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(n_features));
    let scale = x
        .std_axis(Axis(0), 0.0)
        .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
    (mean, scale)
}

fn standardise(x: &Array2<f64>, mean: &Array1<f64>, scale: &Array1<f64>) -> Array2<f64> {
    (x - mean) / scale
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        LOGISTIC_REGRESSION
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        check_training_data(LOGISTIC_REGRESSION, x, y)?;

        let (mean, scale) = standardisation(x);
        let xs = standardise(x, &mean, &scale);
        let targets: Array1<f64> = y.iter().map(|&v| f64::from(v)).collect();
        let n = targets.len() as f64;

        let mut coefficients = Array1::<f64>::zeros(xs.ncols());
        let mut intercept = 0.0;
        let mut previous_loss = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;

        for iter in 0..self.params.max_iter {
            iterations = iter + 1;
            let probas = (xs.dot(&coefficients) + intercept).mapv(Self::sigmoid);
            let loss = self.log_loss(&probas, &targets, &coefficients);
            if !loss.is_finite() {
                return Err(PipelineError::numerical(
                    LOGISTIC_REGRESSION,
                    format!("loss became non-finite at iteration {}", iterations),
                ));
            }

            let errors = &probas - &targets;
            let coef_grad = xs.t().dot(&errors) / n + &coefficients * self.params.l2_penalty;
            let intercept_grad = errors.sum() / n;

            coefficients = coefficients - coef_grad * self.params.learning_rate;
            intercept -= self.params.learning_rate * intercept_grad;

            if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                return Err(PipelineError::numerical(
                    LOGISTIC_REGRESSION,
                    format!("parameters became non-finite at iteration {}", iterations),
                ));
            }

            if (previous_loss - loss).abs() < self.params.tolerance {
                converged = true;
                previous_loss = loss;
                break;
            }
            previous_loss = loss;
        }

        if !converged {
            return Err(PipelineError::numerical(
                LOGISTIC_REGRESSION,
                format!(
                    "did not converge within {} iterations (last loss {:.6})",
                    self.params.max_iter, previous_loss
                ),
            ));
        }

        debug!(
            "{} converged after {} iterations (loss {:.6})",
            LOGISTIC_REGRESSION, iterations, previous_loss
        );
        self.state = Some(FittedState {
            mean,
            scale,
            coefficients,
            intercept,
            iterations,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| not_fitted(LOGISTIC_REGRESSION))?;
        if x.ncols() != state.coefficients.len() {
            return Err(PipelineError::numerical(
                LOGISTIC_REGRESSION,
                format!(
                    "expected {} features, got {}",
                    state.coefficients.len(),
                    x.ncols()
                ),
            ));
        }

        let xs = standardise(x, &state.mean, &state.scale);
        Ok((xs.dot(&state.coefficients) + state.intercept).mapv(Self::sigmoid))
    }
}
