//! JSON-lines reporting sink
//!
//! The columns written for each result are described by a [`ResultSchema`]
//! rather than hard-coded into the sink.

use super::listener::{CellResult, ErrorResult, FullModelResult, ResultListener};
use crate::error::{Result, TaskRunError};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Type of a reported column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Double,
}

/// Names and types of the key and result columns of a report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultSchema {
    pub key_names: &'static [&'static str],
    pub key_types: &'static [ColumnType],
    pub result_names: &'static [&'static str],
    pub result_types: &'static [ColumnType],
}

pub const DATASET_FIELD: &str = "Dataset";
pub const RUN_FIELD: &str = "Run";
pub const FOLD_FIELD: &str = "Fold";
pub const SAMPLE_FIELD: &str = "Sample";
pub const TASK_FIELD: &str = "OpenML_Task_id";
pub const TIMESTAMP_FIELD: &str = "Date_time";

/// Columns reported for every task result
pub const TASK_RESULT_SCHEMA: ResultSchema = ResultSchema {
    key_names: &[DATASET_FIELD, RUN_FIELD, FOLD_FIELD, SAMPLE_FIELD, TASK_FIELD],
    key_types: &[
        ColumnType::String,
        ColumnType::String,
        ColumnType::String,
        ColumnType::String,
        ColumnType::String,
    ],
    result_names: &[TIMESTAMP_FIELD],
    result_types: &[ColumnType::Double],
};

/// Timestamp encoded as `yyyyMMdd.HHmm`
pub fn timestamp_value(timestamp: &DateTime<Utc>) -> f64 {
    let date = timestamp.year() as f64 * 10_000.0
        + timestamp.month() as f64 * 100.0
        + timestamp.day() as f64;
    let time = timestamp.hour() as f64 * 100.0 + timestamp.minute() as f64;
    date + time / 10_000.0
}

/// Reported run number of a 0-based repeat, counted from 1
fn run_number(repeat: u32) -> String {
    (u64::from(repeat) + 1).to_string()
}

impl CellResult<'_> {
    /// Value of a named key or result column; None for unknown names and absent samples
    pub fn column_value(&self, name: &str) -> Option<Value> {
        match name {
            DATASET_FIELD => Some(Value::from(self.dataset.name())),
            RUN_FIELD => Some(Value::from(run_number(self.repeat))),
            FOLD_FIELD => Some(Value::from(self.fold.to_string())),
            SAMPLE_FIELD => self.sample.map(|s| Value::from(s.to_string())),
            TASK_FIELD => Some(Value::from(self.task.task_id.to_string())),
            TIMESTAMP_FIELD => Some(Value::from(timestamp_value(&self.timestamp))),
            _ => None,
        }
    }
}

/// File writer that creates (truncates) its file on the first write
#[derive(Debug)]
pub struct DeferredFile {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl DeferredFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file has been created
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn open(&mut self) -> io::Result<&mut BufWriter<File>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => BufWriter::new(File::create(&self.path)?),
        };
        Ok(self.file.insert(file))
    }
}

impl Write for DeferredFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.open()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Listener writing one JSON object per line
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    schema: ResultSchema,
    written: usize,
}

impl JsonLinesSink<DeferredFile> {
    /// Sink for `path`; the file is replaced only once the first line is written
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(TaskRunError::ConfigError(format!(
                    "output directory {} does not exist",
                    parent.display()
                )));
            }
        }
        Ok(Self::new(DeferredFile::new(path), TASK_RESULT_SCHEMA))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W, schema: ResultSchema) -> Self {
        Self {
            writer,
            schema,
            written: 0,
        }
    }

    /// Number of lines written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, value: &Value) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)
            .map_err(|e| TaskRunError::ListenerError(e.to_string()))?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }
}

impl<W: Write> ResultListener for JsonLinesSink<W> {
    fn accept_result(&mut self, result: CellResult<'_>) -> Result<()> {
        let mut line = Map::new();
        line.insert("kind".to_string(), json!("result"));
        for name in self.schema.key_names.iter().chain(self.schema.result_names) {
            line.insert(
                name.to_string(),
                result.column_value(name).unwrap_or(Value::Null),
            );
        }
        line.insert("flavor".to_string(), json!(result.model.class_name));
        line.insert("config_key".to_string(), json!(result.config_key));
        line.insert("row_ids".to_string(), json!(result.test_row_ids));
        line.insert("predictions".to_string(), serde_json::to_value(&result.predictions)?);
        line.insert("measures".to_string(), serde_json::to_value(&result.measures)?);
        line.insert("raw_metrics".to_string(), serde_json::to_value(&result.raw_metrics)?);
        if let Some(trace) = &result.trace {
            line.insert("trace".to_string(), serde_json::to_value(trace)?);
        }
        line.insert("build_full_model".to_string(), json!(result.build_full_model));
        self.write_line(&Value::Object(line))
    }

    fn accept_error(&mut self, error: ErrorResult<'_>) -> Result<()> {
        let line = json!({
            "kind": "error",
            TASK_FIELD: error.task.task_id.to_string(),
            DATASET_FIELD: error.dataset.name(),
            RUN_FIELD: run_number(error.repeat),
            FOLD_FIELD: error.fold.to_string(),
            SAMPLE_FIELD: error.sample.map(|s| s.to_string()),
            "flavor": error.flavor,
            "config_key": error.config_key,
            "message": error.message,
        });
        self.write_line(&line)
    }

    fn accept_full_model(&mut self, result: FullModelResult<'_>) -> Result<()> {
        let line = json!({
            "kind": "full_model",
            TASK_FIELD: result.task.task_id.to_string(),
            DATASET_FIELD: result.dataset.name(),
            "model": result.model,
            "config_key": result.config_key,
            "measures": result.measures,
            "evaluator": result.evaluator,
        });
        self.write_line(&line)
    }
}
