//! Derived feature columns.
//!
//! Every derived value is a pure function of the three canonical predictor
//! columns; the target is never read. Re-running on a table that already
//! carries the derived columns replaces them in place.

use crate::error::{PipelineError, Result};
use crate::types::{
    ANNUAL_SALARY, BALANCE_TO_SALARY, BANK_BALANCE, EMPLOYED, EMPLOYED_X_LOG_SALARY,
    LOG_ANNUAL_SALARY, LOG_BANK_BALANCE,
};
use crate::utils::column_to_f64;
use polars::prelude::*;
use tracing::debug;

/// Default offset added before the logarithm.
pub const DEFAULT_LOG_OFFSET: f64 = 1.0;

/// Smallest salary used as a ratio denominator.
pub const RATIO_FLOOR: f64 = 1.0;

/// `ln(max(amount, 0) + offset)`.
///
/// Negative amounts are clipped to zero, so the result is finite for any
/// finite input as long as `offset > 0`.
#[inline]
pub fn log_amount(amount: f64, offset: f64) -> f64 {
    (amount.max(0.0) + offset).ln()
}

/// `balance / max(salary, RATIO_FLOOR)`.
#[inline]
pub fn balance_to_salary(balance: f64, salary: f64) -> f64 {
    balance / salary.max(RATIO_FLOOR)
}

/// Append (or replace) the four derived columns.
pub fn add_derived_features(mut df: DataFrame, log_offset: f64) -> Result<DataFrame> {
    let employed = required_values(&df, EMPLOYED)?;
    let balance = required_values(&df, BANK_BALANCE)?;
    let salary = required_values(&df, ANNUAL_SALARY)?;

    let log_balance: Vec<f64> = balance.iter().map(|&b| log_amount(b, log_offset)).collect();
    let log_salary: Vec<f64> = salary.iter().map(|&s| log_amount(s, log_offset)).collect();
    let ratio: Vec<f64> = balance
        .iter()
        .zip(&salary)
        .map(|(&b, &s)| balance_to_salary(b, s))
        .collect();
    let interaction: Vec<f64> = employed
        .iter()
        .zip(&log_salary)
        .map(|(&e, &ls)| e * ls)
        .collect();

    df.with_column(Series::new(LOG_BANK_BALANCE.into(), log_balance))?;
    df.with_column(Series::new(LOG_ANNUAL_SALARY.into(), log_salary))?;
    df.with_column(Series::new(BALANCE_TO_SALARY.into(), ratio))?;
    df.with_column(Series::new(EMPLOYED_X_LOG_SALARY.into(), interaction))?;

    debug!("Derived features added for {} rows", df.height());
    Ok(df)
}

/// Read a predictor column that must be complete.
fn required_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))?;
    column_to_f64(column.as_materialized_series())?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                PipelineError::DataQuality(format!(
                    "column '{}' still has missing values before feature engineering",
                    name
                ))
            })
        })
        .collect()
}
