//! Statistical imputation methods.
//!
//! Median and mean fills for numeric predictors, mode fill for the
//! employment indicator, and row dropping for the `Drop` strategies.

use crate::error::{PipelineError, Result};
use crate::utils::{bool_mode, column_to_f64, mean, median};
use polars::prelude::*;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill nulls in a numeric column with the median of its non-null values.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let values = Self::numeric_values(df, col_name)?;
        let median_val = median(&values).ok_or_else(|| Self::all_missing(col_name))?;
        Self::fill_with_value(df, col_name, median_val, &values, processing_steps, "median")
    }

    /// Fill nulls in a numeric column with the mean of its non-null values.
    pub fn apply_numeric_mean(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let values = Self::numeric_values(df, col_name)?;
        let mean_val = mean(&values).ok_or_else(|| Self::all_missing(col_name))?;
        Self::fill_with_value(df, col_name, mean_val, &values, processing_steps, "mean")
    }

    /// Fill nulls in a 0/1 indicator column with its most frequent value.
    pub fn apply_indicator_mode(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let values = Self::numeric_values(df, col_name)?;
        let flags: Vec<Option<bool>> = values.iter().map(|v| v.map(|x| x >= 0.5)).collect();
        let mode = bool_mode(&flags).ok_or_else(|| Self::all_missing(col_name))?;
        let fill_value = if mode { 1.0 } else { 0.0 };
        Self::fill_with_value(df, col_name, fill_value, &values, processing_steps, "mode")
    }

    /// Drop every row where `col_name` is null.
    pub fn drop_missing_rows(
        df: DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<DataFrame> {
        let column = df
            .column(col_name)
            .map_err(|_| PipelineError::ColumnNotFound(col_name.to_string()))?;
        let null_count = column.null_count();
        if null_count == 0 {
            return Ok(df);
        }

        let mask = column.as_materialized_series().is_not_null();
        let filtered = df.filter(&mask)?;
        processing_steps.push(format!(
            "Dropped {} rows with missing '{}'",
            null_count, col_name
        ));
        debug!("Dropped {} rows with missing '{}'", null_count, col_name);
        Ok(filtered)
    }

    fn numeric_values(df: &DataFrame, col_name: &str) -> Result<Vec<Option<f64>>> {
        let column = df
            .column(col_name)
            .map_err(|_| PipelineError::ColumnNotFound(col_name.to_string()))?;
        Ok(column_to_f64(column.as_materialized_series())?)
    }

    fn all_missing(col_name: &str) -> PipelineError {
        PipelineError::DataQuality(format!(
            "column '{}' has no non-missing values to impute from",
            col_name
        ))
    }

    /// Replace nulls with `fill_value` and write the column back as Float64.
    ///
    /// A step is only recorded when something was actually filled.
    fn fill_with_value(
        df: &mut DataFrame,
        col_name: &str,
        fill_value: f64,
        values: &[Option<f64>],
        processing_steps: &mut Vec<String>,
        method: &str,
    ) -> Result<()> {
        let missing = values.iter().filter(|v| v.is_none()).count();
        let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(fill_value)).collect();
        df.replace(col_name, Series::new(col_name.into(), filled))?;

        if missing > 0 {
            processing_steps.push(format!(
                "Filled {} missing '{}' with {}: {:.2}",
                missing, col_name, method, fill_value
            ));
            debug!("Filled {} missing '{}' with {}", missing, col_name, method);
        }

        Ok(())
    }
}
