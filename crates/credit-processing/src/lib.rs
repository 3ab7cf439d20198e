//! Data loading and preprocessing for the credit default pipeline.
//!
//! # Overview
//!
//! This crate turns a raw customer CSV into a clean feature table:
//!
//! - **Loading**: resolve a file or directory and read it with polars
//! - **Cleaning**: snake-case headers, resolve the default label, drop identifiers
//! - **Imputation**: median/mean/mode fills or row dropping per configuration
//! - **Feature engineering**: log amounts, balance-to-salary ratio, employment interaction
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use credit_processing::{ProjectConfig, preprocess, load_raw_dataframe};
//!
//! let config = ProjectConfig::from_file("config/config.toml")?;
//! let raw = load_raw_dataframe(&config)?;
//! let output = preprocess(raw, &config)?;
//!
//! println!("{} rows, default rate {:.2}%",
//!     output.summary.rows_after,
//!     output.summary.default_rate() * 100.0);
//! ```
//!
//! [`run_preprocessing`] does all three steps and writes the processed CSV
//! to `paths.processed_data_path`.

pub mod config;
pub mod error;
pub mod features;
pub mod imputers;
pub mod loader;
pub mod preprocess;
pub mod types;
pub mod utils;

pub use config::{
    CategoricalImputation, ConfigValidationError, NumericImputation, PathsConfig,
    PreprocessConfig, ProjectConfig, ProjectConfigBuilder, SchemaConfig, TopK, TrainingConfig,
};
pub use error::{PipelineError, Result, ResultExt};
pub use loader::{load_csv, load_processed_dataframe, load_raw_dataframe, write_csv};
pub use preprocess::{Preprocessor, preprocess, run_preprocessing};
pub use types::{
    FEATURE_COLUMNS, PreprocessOutput, PreprocessSummary, TARGET_COLUMN,
};
