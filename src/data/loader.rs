//! Data loading utilities for datasets, split tables and task files

use crate::data::splits::SplitTable;
use crate::error::{Result, TaskRunError};
use crate::task::Task;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Loader for task inputs stored on the local file system
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for schema inference
    infer_schema_length: Option<usize>,
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
            infer_schema_length: Some(100),
        }
    }

    /// Set the number of rows used for schema inference (None scans the whole file)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        self.load_csv_with_separator(path, b',')
    }

    fn load_csv_with_separator(&self, path: &Path, separator: u8) -> Result<DataFrame> {
        let file = File::open(path)
            .map_err(|e| TaskRunError::DataError(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(separator);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| TaskRunError::DataError(e.to_string()))
    }

    /// Load a CSV or TSV file, chosen by extension
    pub fn load_auto(&self, path: &Path) -> Result<DataFrame> {
        let lower = path.to_string_lossy().to_lowercase();

        if lower.ends_with(".tsv") {
            self.load_csv_with_separator(path, b'\t')
        } else {
            self.load_csv(path)
        }
    }

    /// Load a split table file
    pub fn load_splits(&self, path: &Path) -> Result<SplitTable> {
        let frame = self.load_auto(path)?;
        SplitTable::from_frame(&frame)
    }

    /// Load a task description (JSON)
    pub fn load_task(&self, path: &Path) -> Result<Task> {
        let file = File::open(path)
            .map_err(|e| TaskRunError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Ok(serde_json::from_reader(file)?)
    }
}
