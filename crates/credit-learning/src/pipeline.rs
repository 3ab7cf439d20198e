//! End-to-end orchestration of the four stages.
//!
//! ```text
//! raw CSV ──► loader ──► preprocess ──► processed CSV
//!                             │
//!                             ▼
//!                   train_and_score ──► evaluate ──► report CSV
//! ```

use crate::config::TrainerConfig;
use crate::metrics::{MetricRecord, evaluate};
use crate::report::write_report;
use crate::trainer::train_and_score;
use credit_processing::config::ProjectConfig;
use credit_processing::error::{Result, ResultExt};
use credit_processing::loader::load_processed_dataframe;
use credit_processing::preprocess::run_preprocessing;
use credit_processing::types::PreprocessSummary;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub preprocess: PreprocessSummary,
    pub metrics: Vec<MetricRecord>,
}

/// Train, evaluate and write the report for an in-memory feature table.
pub fn train_and_report(
    table: &DataFrame,
    project: &ProjectConfig,
    trainer: &TrainerConfig,
) -> Result<Vec<MetricRecord>> {
    let scores = train_and_score(table, trainer)?;
    let records = scores
        .iter()
        .map(|s| evaluate(s, trainer.top_k))
        .collect::<Result<Vec<_>>>()?;

    for record in &records {
        info!(
            "{}: roc_auc={:.4} pr_auc={:.4} topk_capture={:.4}",
            record.model_name, record.roc_auc, record.pr_auc, record.topk_capture
        );
    }

    write_report(&records, &project.paths.report_path).context("While writing the report")?;
    Ok(records)
}

/// Train on the processed file written by an earlier preprocessing run.
pub fn run_training(project: &ProjectConfig, trainer: &TrainerConfig) -> Result<Vec<MetricRecord>> {
    let table = load_processed_dataframe(project)?;
    info!("Processed dataset loaded: {:?}", table.shape());
    train_and_report(&table, project, trainer)
}

/// Run every stage: load, preprocess (writing the processed file), train,
/// evaluate and write the report.
pub fn run_pipeline(project: &ProjectConfig, trainer: &TrainerConfig) -> Result<PipelineRun> {
    info!("Starting credit default pipeline");
    let output = run_preprocessing(project)?;
    let metrics = train_and_report(&output.data, project, trainer)?;
    info!("Pipeline finished");

    Ok(PipelineRun {
        preprocess: output.summary,
        metrics,
    })
}
