//! Cleaning and feature engineering for the raw customer table.
//!
//! [`Preprocessor::process`] runs the stages below in order. Each stage
//! takes the table by value and returns the transformed one, recording what
//! it changed in the step log:
//!
//! 1. snake-case column names
//! 2. resolve the default label into [`TARGET_COLUMN`] as 0/1
//! 3. drop configured identifier columns
//! 4. coerce predictors to numbers under their canonical names
//! 5. handle missing predictor values
//! 6. append derived features
//! 7. check the result is usable for training
//!
//! The whole run is deterministic, and applying it to its own output gives
//! the same table back.

use crate::config::{CategoricalImputation, NumericImputation, PreprocessConfig, ProjectConfig, SchemaConfig};
use crate::error::{PipelineError, Result, ResultExt};
use crate::features::add_derived_features;
use crate::imputers::StatisticalImputer;
use crate::loader::{load_raw_dataframe, write_csv};
use crate::types::{
    ANNUAL_SALARY, BANK_BALANCE, EMPLOYED, PreprocessOutput, PreprocessSummary, TARGET_COLUMN,
};
use crate::utils::{
    column_to_bool, column_to_f64, is_numeric_dtype, is_string_dtype, parse_boolean_string,
    to_snake_case,
};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Runs the preprocessing stages for one configuration.
pub struct Preprocessor<'a> {
    config: &'a ProjectConfig,
}

impl<'a> Preprocessor<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        Self { config }
    }

    /// Turn a raw customer table into a feature table.
    pub fn process(&self, df: DataFrame) -> Result<PreprocessOutput> {
        let rows_before = df.height();
        if rows_before == 0 {
            return Err(PipelineError::DataQuality("input table is empty".to_string()));
        }

        let mut steps = Vec::new();
        info!("Preprocessing {} rows x {} columns", rows_before, df.width());

        let df = normalize_columns(df, &mut steps)?;
        let df = resolve_target(df, &self.config.schema.target_candidates, &mut steps)?;
        let df = drop_if_present(df, &self.config.schema.drop_if_present, &mut steps)?;
        let df = coerce_predictors(df, &self.config.schema, &mut steps)?;
        let df = handle_missing_values(df, &self.config.preprocessing, &mut steps)?;
        let df = add_derived_features(df, self.config.preprocessing.log_offset)
            .context("While adding derived features")?;
        let positive_count = validate_feature_table(&df)?;

        let summary = PreprocessSummary {
            rows_before,
            rows_after: df.height(),
            columns: df
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            positive_count,
            processing_steps: steps,
        };
        info!(
            "Preprocessing complete: {} -> {} rows, default rate {:.2}%",
            summary.rows_before,
            summary.rows_after,
            summary.default_rate() * 100.0
        );

        Ok(PreprocessOutput { data: df, summary })
    }
}

/// Convenience wrapper around [`Preprocessor::process`].
pub fn preprocess(df: DataFrame, config: &ProjectConfig) -> Result<PreprocessOutput> {
    Preprocessor::new(config).process(df)
}

/// Load the raw table, preprocess it and write the processed CSV.
///
/// The processed file is overwritten on every run.
pub fn run_preprocessing(config: &ProjectConfig) -> Result<PreprocessOutput> {
    let raw = load_raw_dataframe(config)?;
    let mut output = preprocess(raw, config)?;
    write_csv(&mut output.data, &config.paths.processed_data_path)
        .context("While writing the processed dataset")?;
    info!(
        "Processed dataset saved to: {}",
        config.paths.processed_data_path.display()
    );
    Ok(output)
}

/// Snake-case every column name.
///
/// Two source columns collapsing onto the same name is a data-quality error.
pub fn normalize_columns(mut df: DataFrame, steps: &mut Vec<String>) -> Result<DataFrame> {
    let original: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let normalized: Vec<String> = original.iter().map(|name| to_snake_case(name)).collect();

    let mut seen = HashSet::new();
    for (source, name) in original.iter().zip(&normalized) {
        if name.is_empty() {
            return Err(PipelineError::DataQuality(format!(
                "column '{}' has no alphanumeric characters",
                source
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(PipelineError::DataQuality(format!(
                "more than one column normalizes to '{}'",
                name
            )));
        }
    }

    if original != normalized {
        df.set_column_names(normalized.iter().map(|s| s.as_str()))?;
        steps.push(format!("Normalized column names: {:?}", normalized));
        debug!("Normalized column names: {:?}", normalized);
    }

    Ok(df)
}

/// Find the default label, rename it to [`TARGET_COLUMN`] and coerce it to 0/1.
///
/// An existing [`TARGET_COLUMN`] wins over the candidates. Rows whose label
/// cannot be read are dropped; a numeric label outside {0, 1} is an error.
pub fn resolve_target(
    mut df: DataFrame,
    candidates: &[String],
    steps: &mut Vec<String>,
) -> Result<DataFrame> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let source = if columns.iter().any(|c| c == TARGET_COLUMN) {
        TARGET_COLUMN.to_string()
    } else {
        candidates
            .iter()
            .map(|c| to_snake_case(c))
            .find(|c| columns.contains(c))
            .ok_or_else(|| PipelineError::TargetNotFound {
                candidates: candidates.to_vec(),
                columns: columns.clone(),
            })?
    };

    if source != TARGET_COLUMN {
        df.rename(&source, TARGET_COLUMN.into())?;
        steps.push(format!("Renamed target '{}' to '{}'", source, TARGET_COLUMN));
    }

    let labels = target_labels(df.column(TARGET_COLUMN)?.as_materialized_series())?;
    let missing = labels.iter().filter(|v| v.is_none()).count();

    df.replace(TARGET_COLUMN, Series::new(TARGET_COLUMN.into(), labels))?;
    if missing > 0 {
        let mask = df.column(TARGET_COLUMN)?.as_materialized_series().is_not_null();
        df = df.filter(&mask)?;
        warn!("Dropped {} rows with a missing or unreadable target", missing);
        steps.push(format!("Dropped {} rows with missing target", missing));
    }

    Ok(df)
}

/// Read a label column as `Some(0 | 1)` or `None`.
fn target_labels(series: &Series) -> Result<Vec<Option<i32>>> {
    let dtype = series.dtype();
    if matches!(dtype, DataType::Boolean) {
        return Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map(i32::from))
            .collect());
    }

    if is_numeric_dtype(dtype) || matches!(dtype, DataType::Null) {
        let cast = series.cast(&DataType::Float64)?;
        return cast
            .f64()?
            .into_iter()
            .map(|v| match v {
                None => Ok(None),
                Some(x) if x.is_nan() => Ok(None),
                Some(x) if x == 0.0 => Ok(Some(0)),
                Some(x) if x == 1.0 => Ok(Some(1)),
                Some(x) => Err(PipelineError::DataQuality(format!(
                    "target column '{}' contains {} (expected 0 or 1)",
                    TARGET_COLUMN, x
                ))),
            })
            .collect();
    }

    if is_string_dtype(dtype) {
        let cast = series.cast(&DataType::String)?;
        return Ok(cast
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_boolean_string).map(i32::from))
            .collect());
    }

    Err(PipelineError::InvalidColumnType {
        column: TARGET_COLUMN.to_string(),
        expected: "boolean, 0/1 number or yes/no text".to_string(),
    })
}

/// Drop identifier columns named in `drop_list` (compared after snake-casing).
///
/// The target and predictor columns are never dropped.
pub fn drop_if_present(
    df: DataFrame,
    drop_list: &[String],
    steps: &mut Vec<String>,
) -> Result<DataFrame> {
    let protected = [TARGET_COLUMN, EMPLOYED, BANK_BALANCE, ANNUAL_SALARY];
    let drops: HashSet<String> = drop_list
        .iter()
        .map(|c| to_snake_case(c))
        .filter(|c| !protected.contains(&c.as_str()))
        .collect();

    let dropped: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|c| drops.contains(c))
        .collect();

    if dropped.is_empty() {
        return Ok(df);
    }

    let df = df.drop_many(dropped.iter().map(|s| s.as_str()));
    info!("Dropping columns: {:?}", dropped);
    steps.push(format!("Dropped identifier columns: {:?}", dropped));
    Ok(df)
}

/// Bring the three predictors under their canonical names as Float64.
///
/// Currency amounts are parsed from formatted text when needed; the
/// employment status becomes a 0/1 indicator. Values that cannot be read
/// become missing and are handled by the imputation stage.
pub fn coerce_predictors(
    mut df: DataFrame,
    schema: &SchemaConfig,
    steps: &mut Vec<String>,
) -> Result<DataFrame> {
    let mapping = [
        (EMPLOYED, schema.employment_column.as_str()),
        (BANK_BALANCE, schema.balance_column.as_str()),
        (ANNUAL_SALARY, schema.salary_column.as_str()),
    ];

    for (canonical, configured) in mapping {
        let configured = to_snake_case(configured);
        let has_canonical = df.column(canonical).is_ok();
        if !has_canonical {
            if df.column(&configured).is_err() {
                return Err(PipelineError::ColumnNotFound(configured));
            }
            df.rename(&configured, canonical.into())?;
            steps.push(format!("Renamed '{}' to '{}'", configured, canonical));
        }

        let series = df.column(canonical)?.as_materialized_series().clone();
        let dtype = series.dtype().clone();
        if !(is_numeric_dtype(&dtype)
            || is_string_dtype(&dtype)
            || matches!(dtype, DataType::Boolean | DataType::Null))
        {
            return Err(PipelineError::InvalidColumnType {
                column: canonical.to_string(),
                expected: "number, boolean or text".to_string(),
            });
        }

        let values: Vec<Option<f64>> = if canonical == EMPLOYED {
            column_to_bool(&series)?
                .into_iter()
                .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
                .collect()
        } else {
            column_to_f64(&series)?
        };

        let unreadable =
            values.iter().filter(|v| v.is_none()).count() - series.null_count();
        if unreadable > 0 {
            warn!("{} values in '{}' could not be parsed", unreadable, canonical);
            steps.push(format!(
                "Treated {} unparseable '{}' values as missing",
                unreadable, canonical
            ));
        }
        if dtype != DataType::Float64 {
            steps.push(format!("Converted '{}' from {} to Float64", canonical, dtype));
        }

        df.replace(canonical, Series::new(canonical.into(), values))?;
    }

    Ok(df)
}

/// Apply the configured missing-value policy to the predictors.
pub fn handle_missing_values(
    mut df: DataFrame,
    config: &PreprocessConfig,
    steps: &mut Vec<String>,
) -> Result<DataFrame> {
    for col in [BANK_BALANCE, ANNUAL_SALARY] {
        match config.numeric_imputation {
            NumericImputation::Median => {
                StatisticalImputer::apply_numeric_median(&mut df, col, steps)?
            }
            NumericImputation::Mean => StatisticalImputer::apply_numeric_mean(&mut df, col, steps)?,
            NumericImputation::Drop => {
                df = StatisticalImputer::drop_missing_rows(df, col, steps)?;
            }
        }
    }

    match config.categorical_imputation {
        CategoricalImputation::Mode => {
            StatisticalImputer::apply_indicator_mode(&mut df, EMPLOYED, steps)?
        }
        CategoricalImputation::Drop => {
            df = StatisticalImputer::drop_missing_rows(df, EMPLOYED, steps)?;
        }
    }

    Ok(df)
}

/// Check the table can be trained on and return the number of positive rows.
fn validate_feature_table(df: &DataFrame) -> Result<usize> {
    if df.height() == 0 {
        return Err(PipelineError::DataQuality(
            "no rows left after preprocessing".to_string(),
        ));
    }

    let labels = df.column(TARGET_COLUMN)?.cast(&DataType::Int32)?;
    let labels = labels.i32()?;
    let positives = labels.into_iter().filter(|v| *v == Some(1)).count();
    let negatives = labels.into_iter().filter(|v| *v == Some(0)).count();

    if positives == 0 || negatives == 0 {
        return Err(PipelineError::DataQuality(format!(
            "target column '{}' has zero variance ({} positive, {} negative rows)",
            TARGET_COLUMN, positives, negatives
        )));
    }

    Ok(positives)
}
