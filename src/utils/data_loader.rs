//! Data loading utilities

use crate::error::{LooError, Result};
use crate::training::Dataset;
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;

/// Loader for delimited text tables
#[derive(Debug, Clone)]
pub struct DataLoader {
    delimiter: u8,
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: 1000,
        }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Number of rows scanned to infer column types
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LooError::DataError(format!("file not found: {}", path.display())));
        }

        let start = Instant::now();
        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        tracing::debug!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Load a CSV file and split it into features and target
    pub fn load_dataset(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let df = self.load_csv(path)?;
        Dataset::from_dataframe(&df)
    }
}
