//! Column names and result types shared by processing and learning.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Canonical name of the binary default label after preprocessing.
pub const TARGET_COLUMN: &str = "default";

/// Canonical employment indicator column (0.0 / 1.0).
pub const EMPLOYED: &str = "employed";
/// Canonical bank balance column.
pub const BANK_BALANCE: &str = "bank_balance";
/// Canonical annual salary column.
pub const ANNUAL_SALARY: &str = "annual_salary";

pub const LOG_BANK_BALANCE: &str = "log_bank_balance";
pub const LOG_ANNUAL_SALARY: &str = "log_annual_salary";
pub const BALANCE_TO_SALARY: &str = "balance_to_salary";
pub const EMPLOYED_X_LOG_SALARY: &str = "employed_x_log_salary";

/// Raw predictor columns, in matrix order.
pub const BASE_FEATURES: [&str; 3] = [EMPLOYED, BANK_BALANCE, ANNUAL_SALARY];

/// Columns appended by feature engineering, in matrix order.
pub const DERIVED_FEATURES: [&str; 4] = [
    LOG_BANK_BALANCE,
    LOG_ANNUAL_SALARY,
    BALANCE_TO_SALARY,
    EMPLOYED_X_LOG_SALARY,
];

/// Every model predictor, in matrix order. Never contains [`TARGET_COLUMN`].
pub const FEATURE_COLUMNS: [&str; 7] = [
    EMPLOYED,
    BANK_BALANCE,
    ANNUAL_SALARY,
    LOG_BANK_BALANCE,
    LOG_ANNUAL_SALARY,
    BALANCE_TO_SALARY,
    EMPLOYED_X_LOG_SALARY,
];

/// Summary of one preprocessing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessSummary {
    /// Number of rows before preprocessing
    pub rows_before: usize,
    /// Number of rows after preprocessing
    pub rows_after: usize,
    /// Columns present in the output, in order
    pub columns: Vec<String>,
    /// Number of rows labelled as defaulted in the output
    pub positive_count: usize,
    /// Human-readable log of what was changed
    pub processing_steps: Vec<String>,
}

impl PreprocessSummary {
    /// Share of defaulted rows in the output.
    pub fn default_rate(&self) -> f64 {
        if self.rows_after == 0 {
            0.0
        } else {
            self.positive_count as f64 / self.rows_after as f64
        }
    }
}

/// Feature table plus the summary of how it was produced.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub data: DataFrame,
    pub summary: PreprocessSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_columns_exclude_target() {
        assert!(!FEATURE_COLUMNS.contains(&TARGET_COLUMN));
        for name in BASE_FEATURES.iter().chain(DERIVED_FEATURES.iter()) {
            assert!(FEATURE_COLUMNS.contains(name));
        }
    }

    #[test]
    fn test_default_rate() {
        let summary = PreprocessSummary {
            rows_before: 10,
            rows_after: 8,
            columns: vec![],
            positive_count: 2,
            processing_steps: vec![],
        };
        assert_eq!(summary.default_rate(), 0.25);
    }
}
