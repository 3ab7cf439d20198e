//! Configuration types for the credit default pipeline.
//!
//! A run is described by one [`ProjectConfig`], read from a TOML file with
//! [`ProjectConfig::from_file`] or assembled in code with
//! [`ProjectConfig::builder()`]. The struct is immutable once built and is
//! passed explicitly to every stage.
//!
//! ```toml
//! [paths]
//! raw_data_path = "data/raw"
//! processed_data_path = "data/processed/credit_default_processed.csv"
//! report_path = "reports/metrics.csv"
//!
//! [training]
//! random_seed = 42
//! train_fraction = 0.8
//! top_k = 0.1
//! ```
//!
//! Only `[paths]` is required; every other section falls back to its
//! `Default`.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "CREDIT_DEFAULT_CONFIG";

/// Configuration file used when neither a CLI path nor the env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Strategy for imputing missing numeric predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumericImputation {
    /// Use the median of non-null values
    #[default]
    Median,
    /// Use the mean of non-null values
    Mean,
    /// Drop rows with missing values
    Drop,
}

/// Strategy for imputing missing categorical predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalImputation {
    /// Use the most frequent value (mode)
    #[default]
    Mode,
    /// Drop rows with missing values
    Drop,
}

/// How many of the highest-scored rows count towards the top-K capture rate.
///
/// In TOML an integer (`top_k = 50`) is a count and a float
/// (`top_k = 0.1`) is a fraction of the evaluation rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopK {
    /// Fixed number of rows.
    Count(usize),
    /// Fraction of the evaluation rows, in (0, 1].
    Fraction(f64),
}

impl Default for TopK {
    fn default() -> Self {
        TopK::Fraction(0.1)
    }
}

impl TopK {
    /// Resolve to a concrete row count for `n` evaluation rows.
    ///
    /// The result is clamped to `[1, n]`; fractions round up.
    pub fn resolve(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let k = match *self {
            TopK::Count(k) => k,
            TopK::Fraction(f) => (f * n as f64).ceil() as usize,
        };
        k.clamp(1, n)
    }
}

/// File locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw CSV file, or a directory whose first CSV (sorted by name) is used.
    pub raw_data_path: PathBuf,
    /// Where the cleaned feature table is written.
    pub processed_data_path: PathBuf,
    /// Where the metric report is written.
    pub report_path: PathBuf,
}

/// Source column names and the columns to discard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Candidate names for the default label; the first one present wins.
    /// Compared after snake-casing, so `"Defaulted?"` matches `defaulted`.
    pub target_candidates: Vec<String>,
    /// Identifier columns dropped when present.
    pub drop_if_present: Vec<String>,
    /// Employment status column (after snake-casing).
    pub employment_column: String,
    /// Bank balance column (after snake-casing).
    pub balance_column: String,
    /// Annual salary column (after snake-casing).
    pub salary_column: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            target_candidates: vec![
                "Defaulted?".to_string(),
                "default".to_string(),
                "defaulted".to_string(),
            ],
            drop_if_present: vec![
                "Index".to_string(),
                "id".to_string(),
                "Unnamed: 0".to_string(),
            ],
            employment_column: "employed".to_string(),
            balance_column: "bank_balance".to_string(),
            salary_column: "annual_salary".to_string(),
        }
    }
}

/// Missing-value policy and feature constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Strategy for missing bank balance / annual salary values.
    /// Default: Median
    pub numeric_imputation: NumericImputation,
    /// Strategy for missing employment status.
    /// Default: Mode
    pub categorical_imputation: CategoricalImputation,
    /// Offset added before taking the logarithm of currency amounts.
    /// Default: 1.0
    pub log_offset: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            numeric_imputation: NumericImputation::default(),
            categorical_imputation: CategoricalImputation::default(),
            log_offset: 1.0,
        }
    }
}

/// Split and evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Random seed for the split and the forest.
    /// Default: 42
    pub random_seed: u64,
    /// Share of rows used for training, in (0, 1).
    /// Default: 0.8
    pub train_fraction: f64,
    /// Keep the default rate equal in both halves of the split.
    /// Default: true
    pub stratify: bool,
    /// Size of the top-K window for the capture rate.
    /// Default: 10% of the evaluation rows
    pub top_k: TopK,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            random_seed: 42,
            train_fraction: 0.8,
            stratify: true,
            top_k: TopK::default(),
        }
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub preprocessing: PreprocessConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl ProjectConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProjectConfigBuilder {
        ProjectConfigBuilder::default()
    }

    /// Read and validate a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            PipelineError::Toml(inner) => PipelineError::Config {
                path: path.to_path_buf(),
                reason: inner.to_string(),
            },
            other => other.with_context(format!("In {}", path.display())),
        })
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ProjectConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Pick the configuration file: explicit path, then
    /// [`CONFIG_PATH_ENV`], then [`DEFAULT_CONFIG_PATH`].
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
            _ => PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        for (field, path) in [
            ("raw_data_path", &self.paths.raw_data_path),
            ("processed_data_path", &self.paths.processed_data_path),
            ("report_path", &self.paths.report_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigValidationError::EmptyPath(field.to_string()));
            }
        }

        let fraction = self.training.train_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigValidationError::InvalidFraction {
                field: "train_fraction".to_string(),
                value: fraction,
            });
        }

        match self.training.top_k {
            TopK::Count(0) => return Err(ConfigValidationError::InvalidTopK("0".to_string())),
            TopK::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(ConfigValidationError::InvalidTopK(f.to_string()));
            }
            _ => {}
        }

        let offset = self.preprocessing.log_offset;
        if !(offset.is_finite() && offset > 0.0) {
            return Err(ConfigValidationError::InvalidLogOffset(offset));
        }

        if self.schema.target_candidates.is_empty() {
            return Err(ConfigValidationError::NoTargetCandidates);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Path '{0}' must not be empty")]
    EmptyPath(String),

    #[error("Invalid fraction for '{field}': {value} (must be strictly between 0.0 and 1.0)")]
    InvalidFraction { field: String, value: f64 },

    #[error("Invalid top_k: {0} (must be a positive count or a fraction in (0, 1])")]
    InvalidTopK(String),

    #[error("Invalid log_offset: {0} (must be a positive finite number)")]
    InvalidLogOffset(f64),

    #[error("target_candidates must name at least one column")]
    NoTargetCandidates,

    #[error("Invalid model parameter '{field}': {reason}")]
    InvalidParameter { field: String, reason: String },
}

/// Builder for [`ProjectConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProjectConfigBuilder {
    raw_data_path: Option<PathBuf>,
    processed_data_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
    schema: Option<SchemaConfig>,
    numeric_imputation: Option<NumericImputation>,
    categorical_imputation: Option<CategoricalImputation>,
    log_offset: Option<f64>,
    random_seed: Option<u64>,
    train_fraction: Option<f64>,
    stratify: Option<bool>,
    top_k: Option<TopK>,
}

impl ProjectConfigBuilder {
    /// Set the raw CSV file or directory.
    pub fn raw_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_data_path = Some(path.into());
        self
    }

    /// Set the output location of the processed feature table.
    pub fn processed_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.processed_data_path = Some(path.into());
        self
    }

    /// Set the output location of the metric report.
    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Replace the whole schema section.
    pub fn schema(mut self, schema: SchemaConfig) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the numeric imputation strategy.
    pub fn numeric_imputation(mut self, strategy: NumericImputation) -> Self {
        self.numeric_imputation = Some(strategy);
        self
    }

    /// Set the categorical imputation strategy.
    pub fn categorical_imputation(mut self, strategy: CategoricalImputation) -> Self {
        self.categorical_imputation = Some(strategy);
        self
    }

    /// Set the logarithm offset.
    pub fn log_offset(mut self, offset: f64) -> Self {
        self.log_offset = Some(offset);
        self
    }

    /// Set the random seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the training fraction.
    ///
    /// # Arguments
    /// * `fraction` - Value strictly between 0.0 and 1.0 (e.g., 0.8 = 80/20 split)
    pub fn train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = Some(fraction);
        self
    }

    /// Enable or disable stratified splitting.
    pub fn stratify(mut self, stratify: bool) -> Self {
        self.stratify = Some(stratify);
        self
    }

    /// Set the top-K window.
    pub fn top_k(mut self, top_k: TopK) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Build the configuration.
    ///
    /// Paths default to the `data/` and `reports/` layout of the CLI.
    pub fn build(self) -> std::result::Result<ProjectConfig, ConfigValidationError> {
        let training_defaults = TrainingConfig::default();
        let config = ProjectConfig {
            paths: PathsConfig {
                raw_data_path: self
                    .raw_data_path
                    .unwrap_or_else(|| PathBuf::from("data/raw")),
                processed_data_path: self.processed_data_path.unwrap_or_else(|| {
                    PathBuf::from("data/processed/credit_default_processed.csv")
                }),
                report_path: self
                    .report_path
                    .unwrap_or_else(|| PathBuf::from("reports/metrics.csv")),
            },
            schema: self.schema.unwrap_or_default(),
            preprocessing: PreprocessConfig {
                numeric_imputation: self.numeric_imputation.unwrap_or_default(),
                categorical_imputation: self.categorical_imputation.unwrap_or_default(),
                log_offset: self.log_offset.unwrap_or(1.0),
            },
            training: TrainingConfig {
                random_seed: self.random_seed.unwrap_or(training_defaults.random_seed),
                train_fraction: self
                    .train_fraction
                    .unwrap_or(training_defaults.train_fraction),
                stratify: self.stratify.unwrap_or(training_defaults.stratify),
                top_k: self.top_k.unwrap_or_default(),
            },
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"
        [paths]
        raw_data_path = "data/raw"
        processed_data_path = "data/processed/out.csv"
        report_path = "reports/metrics.csv"
    "#;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = ProjectConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.paths.raw_data_path, PathBuf::from("data/raw"));
        assert_eq!(config.training, TrainingConfig::default());
        assert_eq!(config.preprocessing, PreprocessConfig::default());
        assert_eq!(config.schema.balance_column, "bank_balance");
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            [paths]
            raw_data_path = "in.csv"
            processed_data_path = "out.csv"
            report_path = "report.csv"

            [schema]
            target_candidates = ["Defaulted?"]
            drop_if_present = []
            employment_column = "employed"
            balance_column = "bank_balance"
            salary_column = "annual_salary"

            [preprocessing]
            numeric_imputation = "mean"
            categorical_imputation = "drop"
            log_offset = 2.0

            [training]
            random_seed = 7
            train_fraction = 0.75
            stratify = false
            top_k = 25
        "#;

        let config = ProjectConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.preprocessing.numeric_imputation, NumericImputation::Mean);
        assert_eq!(
            config.preprocessing.categorical_imputation,
            CategoricalImputation::Drop
        );
        assert_eq!(config.preprocessing.log_offset, 2.0);
        assert_eq!(config.training.random_seed, 7);
        assert_eq!(config.training.train_fraction, 0.75);
        assert!(!config.training.stratify);
        assert_eq!(config.training.top_k, TopK::Count(25));
        assert_eq!(config.schema.target_candidates, vec!["Defaulted?".to_string()]);
    }

    #[test]
    fn test_top_k_fraction_from_toml() {
        let toml = format!("{MINIMAL}\n[training]\ntop_k = 0.05\n");
        let config = ProjectConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.training.top_k, TopK::Fraction(0.05));
    }

    #[test]
    fn test_missing_paths_section_is_an_error() {
        let result = ProjectConfig::from_toml_str("[training]\nrandom_seed = 1\n");
        assert!(matches!(result, Err(PipelineError::Toml(_))));
    }

    #[test]
    fn test_validation_invalid_train_fraction() {
        let result = ProjectConfig::builder().train_fraction(1.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidFraction { .. }
        ));

        let result = ProjectConfig::builder().train_fraction(0.0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_invalid_top_k() {
        assert!(ProjectConfig::builder().top_k(TopK::Count(0)).build().is_err());
        assert!(ProjectConfig::builder()
            .top_k(TopK::Fraction(1.5))
            .build()
            .is_err());
        assert!(ProjectConfig::builder().top_k(TopK::Fraction(1.0)).build().is_ok());
    }

    #[test]
    fn test_validation_invalid_offset() {
        let result = ProjectConfig::builder().log_offset(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidLogOffset(_)
        ));
    }

    #[test]
    fn test_top_k_resolve() {
        assert_eq!(TopK::Count(10).resolve(200), 10);
        assert_eq!(TopK::Count(500).resolve(200), 200);
        assert_eq!(TopK::Fraction(0.1).resolve(200), 20);
        assert_eq!(TopK::Fraction(0.1).resolve(5), 1);
        assert_eq!(TopK::Fraction(0.001).resolve(200), 1);
        assert_eq!(TopK::Count(3).resolve(0), 0);
    }

    #[test]
    fn test_from_file_missing_reports_path() {
        let err = ProjectConfig::from_file("definitely/not/here.toml").unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("definitely/not/here.toml"));
    }

    #[test]
    fn test_from_file_malformed_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths\nraw_data_path = ").unwrap();

        let err = ProjectConfig::from_file(&path).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        let explicit = PathBuf::from("custom/run.toml");
        assert_eq!(ProjectConfig::resolve_path(Some(&explicit)), explicit);
    }

    /// Serialises tests that change the process environment.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_resolve_path_env_override_then_default() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let previous = std::env::var_os(CONFIG_PATH_ENV);

        // SAFETY: ENV_LOCK is held and no other test in this crate reads the
        // environment concurrently.
        unsafe { std::env::set_var(CONFIG_PATH_ENV, "  from/env.toml ") };
        assert_eq!(ProjectConfig::resolve_path(None), PathBuf::from("from/env.toml"));
        let explicit = PathBuf::from("custom/run.toml");
        assert_eq!(ProjectConfig::resolve_path(Some(&explicit)), explicit);

        unsafe { std::env::set_var(CONFIG_PATH_ENV, "   ") };
        assert_eq!(ProjectConfig::resolve_path(None), PathBuf::from(DEFAULT_CONFIG_PATH));

        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
        assert_eq!(ProjectConfig::resolve_path(None), PathBuf::from(DEFAULT_CONFIG_PATH));

        if let Some(value) = previous {
            unsafe { std::env::set_var(CONFIG_PATH_ENV, value) };
        }
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ProjectConfig::builder().random_seed(99).build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ProjectConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
