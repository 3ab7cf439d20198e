//! Training configuration.
//!
//! [`TrainerConfig`] carries the split and evaluation settings from the
//! project's `[training]` section plus the hyperparameters of the two
//! baseline models.

use credit_processing::config::{ConfigValidationError, ProjectConfig, TopK};
use serde::{Deserialize, Serialize};

/// Gradient descent settings for [`crate::models::LogisticRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    /// Step size for each gradient update.
    /// Default: 0.1
    pub learning_rate: f64,
    /// Upper bound on gradient descent iterations.
    /// Default: 10000
    pub max_iter: usize,
    /// Stop once the loss improves by less than this.
    /// Default: 1e-6
    pub tolerance: f64,
    /// L2 penalty on the coefficients (the intercept is not penalised).
    /// Default: 1e-4
    pub l2_penalty: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 10_000,
            tolerance: 1e-6,
            l2_penalty: 1e-4,
        }
    }
}

/// Settings for [`crate::models::RandomForest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of bagged trees.
    /// Default: 100
    pub n_trees: usize,
    /// Maximum depth of each tree (the root is depth 0).
    /// Default: 8
    pub max_depth: usize,
    /// Smallest number of training rows allowed in a leaf.
    /// Default: 5
    pub min_samples_leaf: usize,
    /// Features tried per split. `None` means `round(sqrt(p))`.
    /// Default: None
    pub max_features: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 8,
            min_samples_leaf: 5,
            max_features: None,
        }
    }
}

/// Everything the trainer and reporter need for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainerConfig {
    /// Seed for the split and for every tree in the forest.
    pub random_seed: u64,
    /// Share of rows used for training, in (0, 1).
    pub train_fraction: f64,
    /// Keep the default rate equal across train and eval.
    pub stratify: bool,
    /// Top-K window for the capture rate.
    pub top_k: TopK,
    pub logistic: LogisticParams,
    pub forest: ForestParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            random_seed: 42,
            train_fraction: 0.8,
            stratify: true,
            top_k: TopK::default(),
            logistic: LogisticParams::default(),
            forest: ForestParams::default(),
        }
    }
}

impl TrainerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> TrainerConfigBuilder {
        TrainerConfigBuilder::default()
    }

    /// Take the `[training]` settings from a project configuration and the
    /// default model hyperparameters.
    pub fn from_project(config: &ProjectConfig) -> Self {
        Self {
            random_seed: config.training.random_seed,
            train_fraction: config.training.train_fraction,
            stratify: config.training.stratify,
            top_k: config.training.top_k,
            ..Self::default()
        }
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ConfigValidationError::InvalidFraction {
                field: "train_fraction".to_string(),
                value: self.train_fraction,
            });
        }

        match self.top_k {
            TopK::Count(0) => return Err(ConfigValidationError::InvalidTopK("0".to_string())),
            TopK::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(ConfigValidationError::InvalidTopK(f.to_string()));
            }
            _ => {}
        }

        let lr = &self.logistic;
        if !(lr.learning_rate.is_finite() && lr.learning_rate > 0.0) {
            return Err(invalid("learning_rate", "must be a positive finite number"));
        }
        if lr.max_iter == 0 {
            return Err(invalid("max_iter", "must be at least 1"));
        }
        if !(lr.tolerance.is_finite() && lr.tolerance >= 0.0) {
            return Err(invalid("tolerance", "must be a non-negative finite number"));
        }
        if !(lr.l2_penalty.is_finite() && lr.l2_penalty >= 0.0) {
            return Err(invalid("l2_penalty", "must be a non-negative finite number"));
        }

        let rf = &self.forest;
        if rf.n_trees == 0 {
            return Err(invalid("n_trees", "must be at least 1"));
        }
        if rf.min_samples_leaf == 0 {
            return Err(invalid("min_samples_leaf", "must be at least 1"));
        }
        if rf.max_features == Some(0) {
            return Err(invalid("max_features", "must be at least 1"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidParameter {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Builder for [`TrainerConfig`].
///
/// # Example
///
/// ```
/// use credit_learning::TrainerConfig;
///
/// let config = TrainerConfig::builder()
///     .random_seed(7)
///     .n_trees(20)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.forest.n_trees, 20);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TrainerConfigBuilder {
    config: TrainerConfig,
}

impl TrainerConfigBuilder {
    /// Start from the `[training]` section of a project configuration.
    pub fn project(mut self, config: &ProjectConfig) -> Self {
        let logistic = self.config.logistic.clone();
        let forest = self.config.forest.clone();
        self.config = TrainerConfig {
            logistic,
            forest,
            ..TrainerConfig::from_project(config)
        };
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    pub fn train_fraction(mut self, fraction: f64) -> Self {
        self.config.train_fraction = fraction;
        self
    }

    pub fn stratify(mut self, stratify: bool) -> Self {
        self.config.stratify = stratify;
        self
    }

    pub fn top_k(mut self, top_k: TopK) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.config.logistic.learning_rate = learning_rate;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.logistic.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.logistic.tolerance = tolerance;
        self
    }

    pub fn l2_penalty(mut self, l2_penalty: f64) -> Self {
        self.config.logistic.l2_penalty = l2_penalty;
        self
    }

    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.config.forest.n_trees = n_trees;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.forest.max_depth = max_depth;
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.config.forest.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.config.forest.max_features = Some(max_features);
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<TrainerConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_project_copies_training_section() {
        let project = ProjectConfig::builder()
            .random_seed(99)
            .train_fraction(0.7)
            .stratify(false)
            .top_k(TopK::Count(10))
            .build()
            .unwrap();

        let config = TrainerConfig::from_project(&project);
        assert_eq!(config.random_seed, 99);
        assert_eq!(config.train_fraction, 0.7);
        assert!(!config.stratify);
        assert_eq!(config.top_k, TopK::Count(10));
        assert_eq!(config.forest, ForestParams::default());
    }

    #[test]
    fn test_builder_keeps_model_params_when_project_applied_later() {
        let project = ProjectConfig::builder().random_seed(3).build().unwrap();
        let config = TrainerConfig::builder()
            .n_trees(10)
            .project(&project)
            .build()
            .unwrap();
        assert_eq!(config.random_seed, 3);
        assert_eq!(config.forest.n_trees, 10);
    }

    #[test]
    fn test_builder_rejects_bad_values() {
        assert!(TrainerConfig::builder().train_fraction(1.0).build().is_err());
        assert!(TrainerConfig::builder().top_k(TopK::Fraction(1.5)).build().is_err());
        assert!(TrainerConfig::builder().learning_rate(0.0).build().is_err());
        assert!(TrainerConfig::builder().max_iter(0).build().is_err());
        assert!(TrainerConfig::builder().n_trees(0).build().is_err());
        assert!(TrainerConfig::builder().min_samples_leaf(0).build().is_err());
        assert!(TrainerConfig::builder().max_features(0).build().is_err());
    }

    #[test]
    fn test_invalid_parameter_message_names_field() {
        let err = TrainerConfig::builder().l2_penalty(-1.0).build().unwrap_err();
        assert!(err.to_string().contains("l2_penalty"));
    }
}
