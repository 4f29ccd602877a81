//! Dataset ingestion.
//!
//! Loads a raw dataset from disk and normalises it so the later steps see
//! nulls where the export used textual markers, and numbers where a column
//! was only read as text because of those markers.

use crate::error::{ProcessingError, Result, ResultExt};
use crate::utils::{is_missing_marker, numeric_ratio, parse_numeric_string};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Parquet,
}

impl DatasetFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" | "pq" => Ok(Self::Parquet),
            _ => Err(ProcessingError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Loads datasets from disk.
#[derive(Debug, Clone)]
pub struct DataIngestor {
    normalize: bool,
}

impl Default for DataIngestor {
    fn default() -> Self {
        Self { normalize: true }
    }
}

impl DataIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip marker and numeric normalisation, returning the frame as read.
    pub fn raw() -> Self {
        Self { normalize: false }
    }

    /// Load a dataset, dispatching on the file extension.
    ///
    /// Row count is preserved; only cell values and column dtypes change
    /// during normalisation.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProcessingError::InvalidConfig(format!(
                "Dataset file '{}' does not exist",
                path.display()
            )));
        }

        let df = match DatasetFormat::from_path(path)? {
            DatasetFormat::Csv => Self::read_csv(path)?,
            DatasetFormat::Parquet => Self::read_parquet(path)?,
        };
        info!(
            "Loaded {} rows x {} columns from {}",
            df.height(),
            df.width(),
            path.display()
        );

        if self.normalize {
            Self::normalize(df)
        } else {
            Ok(df)
        }
    }

    fn read_csv(path: &Path) -> Result<DataFrame> {
        CsvReadOptions::default()
            .with_infer_schema_length(None)
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))
            .context(format!("Failed to open {}", path.display()))?
            .finish()
            .context(format!("Failed to parse {}", path.display()))
    }

    fn read_parquet(path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;
        ParquetReader::new(file)
            .finish()
            .context(format!("Failed to parse {}", path.display()))
    }

    /// Replace missing markers with nulls and convert all-numeric text columns.
    pub fn normalize(mut df: DataFrame) -> Result<DataFrame> {
        let string_columns: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|c| c.dtype() == &DataType::String)
            .map(|c| c.name().to_string())
            .collect();

        for name in &string_columns {
            let series = df.column(name)?.as_materialized_series();
            let ca = series.str()?;

            let mut markers = 0usize;
            let cleaned: Vec<Option<&str>> = ca
                .into_iter()
                .map(|v| match v {
                    Some(s) if is_missing_marker(s) => {
                        markers += 1;
                        None
                    }
                    other => other,
                })
                .collect();
            let cleaned = Series::new(series.name().clone(), cleaned);

            let has_values = cleaned.null_count() < cleaned.len();
            if has_values && numeric_ratio(&cleaned) == 1.0 {
                let parsed: Vec<Option<f64>> = cleaned
                    .str()?
                    .into_iter()
                    .map(|v| v.and_then(parse_numeric_string))
                    .collect();
                debug!(
                    "Column '{}': {} markers nulled, converted to Float64",
                    name, markers
                );
                df.replace(name, Series::new(name.as_str().into(), parsed))?;
            } else if markers > 0 {
                debug!("Column '{}': {} markers nulled", name, markers);
                df.replace(name, cleaned)?;
            }
        }

        Ok(df)
    }
}
