//! Conversion from the feature table to model matrices.

use credit_processing::error::{PipelineError, Result};
use credit_processing::types::{FEATURE_COLUMNS, TARGET_COLUMN};
use credit_processing::utils::column_to_f64;
use ndarray::{Array2, Axis};
use polars::prelude::*;

/// Predictor matrix and 0/1 labels, row-aligned with the source table.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// `n_rows x FEATURE_COLUMNS.len()`, columns in [`FEATURE_COLUMNS`] order
    pub features: Array2<f64>,
    pub labels: Vec<u8>,
}

impl Dataset {
    /// Extract the predictors and the target from a feature table.
    ///
    /// Every predictor value must be present and finite and every label must
    /// be 0 or 1. The target column never enters the matrix.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let n_rows = df.height();
        let mut features = Array2::<f64>::zeros((n_rows, FEATURE_COLUMNS.len()));

        for (j, name) in FEATURE_COLUMNS.iter().enumerate() {
            let column = df
                .column(name)
                .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))?;
            let values = column_to_f64(column.as_materialized_series())?;
            for (i, value) in values.into_iter().enumerate() {
                match value {
                    Some(v) if v.is_finite() => features[[i, j]] = v,
                    _ => {
                        return Err(PipelineError::DataQuality(format!(
                            "column '{}' has a missing or non-finite value at row {}",
                            name, i
                        )));
                    }
                }
            }
        }

        let target = df
            .column(TARGET_COLUMN)
            .map_err(|_| PipelineError::ColumnNotFound(TARGET_COLUMN.to_string()))?;
        let labels = column_to_f64(target.as_materialized_series())?
            .into_iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(x) if x == 0.0 => Ok(0u8),
                Some(x) if x == 1.0 => Ok(1u8),
                _ => Err(PipelineError::DataQuality(format!(
                    "target column '{}' must be 0 or 1 (row {})",
                    TARGET_COLUMN, i
                ))),
            })
            .collect::<Result<Vec<u8>>>()?;

        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Copy out the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Vec<u8>) {
        let features = self.features.select(Axis(0), indices);
        let labels = indices.iter().map(|&i| self.labels[i]).collect();
        (features, labels)
    }
}
