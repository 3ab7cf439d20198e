//! Dataset loading and saving.
//!
//! The raw location in the configuration may point at a CSV file or at a
//! directory; for a directory the first `*.csv` by file name is used. Reading
//! has no side effects. Writing creates parent directories and overwrites.

use crate::config::ProjectConfig;
use crate::error::{PipelineError, Result};
use crate::utils::BOM;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of rows polars inspects when inferring column types.
const INFER_SCHEMA_ROWS: usize = 1000;

/// Return the first CSV file in `dir`, sorted by file name.
pub fn find_first_csv(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::Config {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::Config {
            path: dir.to_path_buf(),
            reason: "no CSV files found in directory".to_string(),
        })
}

/// Resolve the configured raw location to a concrete CSV file.
pub fn resolve_raw_path(raw_data_path: &Path) -> Result<PathBuf> {
    if raw_data_path.is_dir() {
        let path = find_first_csv(raw_data_path)?;
        debug!("Resolved raw data directory to {}", path.display());
        Ok(path)
    } else if raw_data_path.is_file() {
        Ok(raw_data_path.to_path_buf())
    } else {
        Err(PipelineError::Config {
            path: raw_data_path.to_path_buf(),
            reason: "raw data path does not exist".to_string(),
        })
    }
}

/// Read a CSV file with a header row into a DataFrame.
///
/// A missing file is a configuration error; a file that polars cannot parse
/// is a data error. Both name the path.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(PipelineError::Config {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }

    let parse_error = |e: PolarsError| PipelineError::DataParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(parse_error)?
        .finish()
        .map_err(parse_error)?;

    if df.width() == 0 {
        return Err(PipelineError::DataParse {
            path: path.to_path_buf(),
            reason: "no columns found".to_string(),
        });
    }

    strip_header_bom(&mut df)?;
    debug!("Loaded {} with shape {:?}", path.display(), df.shape());
    Ok(df)
}

/// Write a DataFrame as CSV with a header, replacing any existing file.
///
/// Failures to create the directory or write the file are configuration
/// errors naming the path.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let unwritable = |target: &Path, reason: String| PipelineError::Config {
        path: target.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| unwritable(parent, format!("cannot create directory: {}", e)))?;
    }

    let mut file =
        File::create(path).map_err(|e| unwritable(path, format!("cannot create file: {}", e)))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .map_err(|e| unwritable(path, format!("cannot write CSV: {}", e)))?;

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Resolve the raw location from `config` and load it.
pub fn load_raw_dataframe(config: &ProjectConfig) -> Result<DataFrame> {
    let path = resolve_raw_path(&config.paths.raw_data_path)?;
    info!("Loading raw dataset from: {}", path.display());
    let df = load_csv(&path)?;
    info!("Raw dataset loaded: {:?}", df.shape());
    Ok(df)
}

/// Load the processed feature table written by the preprocessing stage.
pub fn load_processed_dataframe(config: &ProjectConfig) -> Result<DataFrame> {
    let path = &config.paths.processed_data_path;
    info!("Loading processed dataset from: {}", path.display());
    load_csv(path)
}

/// Remove a UTF-8 byte order mark that polars kept in the first header.
fn strip_header_bom(df: &mut DataFrame) -> Result<()> {
    let first = match df.get_column_names().first() {
        Some(name) if name.starts_with(BOM) => name.to_string(),
        _ => return Ok(()),
    };
    let cleaned = first.trim_start_matches(BOM).to_string();
    df.rename(&first, cleaned.into())?;
    Ok(())
}
