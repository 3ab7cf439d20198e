//! credit-learning: baseline default classifiers and their evaluation.
//!
//! This crate takes the feature table produced by `credit_processing`,
//! fits a logistic regression and a random forest on a seeded train split,
//! and reports ROC-AUC, PR-AUC and top-K capture on the held-out rows.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use credit_learning::{TrainerConfig, run_pipeline};
//! use credit_processing::ProjectConfig;
//!
//! let project = ProjectConfig::from_file("config/config.toml")?;
//! let trainer = TrainerConfig::from_project(&project);
//!
//! let run = run_pipeline(&project, &trainer)?;
//! for record in &run.metrics {
//!     println!("{}: ROC-AUC {:.3}", record.model_name, record.roc_auc);
//! }
//! ```
//!
//! Errors are [`credit_processing::PipelineError`]; model failures use the
//! `Numerical` variant and name the model.

pub mod config;
pub mod dataset;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod split;
pub mod trainer;

pub use config::{ForestParams, LogisticParams, TrainerConfig, TrainerConfigBuilder};
pub use credit_processing::{PipelineError, Result};
pub use dataset::Dataset;
pub use metrics::{MetricRecord, evaluate, pr_auc, roc_auc, top_k_capture};
pub use models::{Classifier, LOGISTIC_REGRESSION, LogisticRegression, RANDOM_FOREST, RandomForest};
pub use pipeline::{PipelineRun, run_pipeline, run_training, train_and_report};
pub use report::{read_report, write_report};
pub use split::{Split, train_eval_split};
pub use trainer::{ModelScores, train_and_score};
