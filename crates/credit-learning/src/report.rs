//! Metric report file.

use crate::metrics::MetricRecord;
use credit_processing::error::{PipelineError, Result};
use credit_processing::loader::{load_csv, write_csv};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Columns of the report, in file order.
pub const REPORT_COLUMNS: [&str; 4] = ["model_name", "roc_auc", "pr_auc", "topk_capture"];

fn records_to_frame(records: &[MetricRecord]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new(
            REPORT_COLUMNS[0].into(),
            records.iter().map(|r| r.model_name.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            REPORT_COLUMNS[1].into(),
            records.iter().map(|r| r.roc_auc).collect::<Vec<_>>(),
        ),
        Column::new(
            REPORT_COLUMNS[2].into(),
            records.iter().map(|r| r.pr_auc).collect::<Vec<_>>(),
        ),
        Column::new(
            REPORT_COLUMNS[3].into(),
            records.iter().map(|r| r.topk_capture).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

/// Sibling path used while the report is being written.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the report, replacing any previous one.
///
/// The table is written to a staging file first and renamed into place, so
/// readers see either the old report or the complete new one.
pub fn write_report(records: &[MetricRecord], path: &Path) -> Result<()> {
    let mut df = records_to_frame(records)?;
    let staging = staging_path(path);

    if let Err(e) = write_csv(&mut df, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(PipelineError::Config {
            path: path.to_path_buf(),
            reason: format!("cannot replace report: {}", e),
        });
    }

    info!(
        "Wrote {} metric records to {} at {}",
        records.len(),
        path.display(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

/// Read a report written by [`write_report`].
pub fn read_report(path: &Path) -> Result<Vec<MetricRecord>> {
    let df = load_csv(path)?;
    for name in REPORT_COLUMNS {
        if df.column(name).is_err() {
            return Err(PipelineError::ColumnNotFound(name.to_string()));
        }
    }

    let names = df.column(REPORT_COLUMNS[0])?.cast(&DataType::String)?;
    let names = names.str()?;
    let metric = |name: &str| -> Result<Vec<Option<f64>>> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    };
    let roc = metric(REPORT_COLUMNS[1])?;
    let pr = metric(REPORT_COLUMNS[2])?;
    let topk = metric(REPORT_COLUMNS[3])?;

    (0..df.height())
        .map(|i| {
            let missing = || PipelineError::DataParse {
                path: path.to_path_buf(),
                reason: format!("incomplete report row {}", i),
            };
            Ok(MetricRecord {
                model_name: names.get(i).ok_or_else(missing)?.to_string(),
                roc_auc: roc[i].ok_or_else(missing)?,
                pr_auc: pr[i].ok_or_else(missing)?,
                topk_capture: topk[i].ok_or_else(missing)?,
            })
        })
        .collect()
}
