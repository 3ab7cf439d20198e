//! Baseline default classifiers.
//!
//! Both models implement [`Classifier`]: fit on a feature matrix with 0/1
//! labels, then score rows with the probability of default.

mod forest;
mod logistic;
mod tree;

pub use forest::RandomForest;
pub use logistic::LogisticRegression;
pub use tree::DecisionTree;

use credit_processing::error::{PipelineError, Result};
use ndarray::{Array1, Array2};

/// Name reported for [`LogisticRegression`].
pub const LOGISTIC_REGRESSION: &str = "logistic_regression";
/// Name reported for [`RandomForest`].
pub const RANDOM_FOREST: &str = "random_forest";

/// A binary classifier producing positive-class probabilities.
pub trait Classifier {
    /// Stable name used in logs and in the metric report.
    fn name(&self) -> &'static str;

    /// Fit on `x` (`n_rows x n_features`) and labels in {0, 1}.
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()>;

    /// Probability of the positive class for each row of `x`.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Shared input checks for [`Classifier::fit`].
///
/// A training set with a single class cannot separate anything, so it is
/// reported as a numerical error for the model.
pub(crate) fn check_training_data(model: &str, x: &Array2<f64>, y: &[u8]) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::numerical(
            model,
            format!("{} feature rows but {} labels", x.nrows(), y.len()),
        ));
    }
    if y.is_empty() {
        return Err(PipelineError::numerical(model, "cannot fit with zero samples"));
    }
    if y.iter().any(|&label| label > 1) {
        return Err(PipelineError::numerical(model, "labels must be 0 or 1"));
    }

    let positives = y.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == y.len() {
        return Err(PipelineError::numerical(
            model,
            "training labels contain a single class",
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::numerical(model, "non-finite feature value"));
    }
    Ok(())
}

pub(crate) fn not_fitted(model: &str) -> PipelineError {
    PipelineError::numerical(model, "model has not been fitted")
}
