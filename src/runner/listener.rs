//! Result listener capability
//!
//! The runner pushes every cell outcome to a listener: successful cells through
//! [`ResultListener::accept_result`], cells the evaluator could not process
//! through [`ResultListener::accept_error`], and the optional full-dataset model
//! through [`ResultListener::accept_full_model`].

use crate::data::PreparedDataset;
use crate::error::Result;
use crate::evaluation::{
    CanonicalMeasures, EvaluatorDescriptor, ModelHandle, OptimizationTrace, Prediction, RawMetrics,
};
use crate::task::{Task, TaskId};
use chrono::{DateTime, Utc};

/// Outcome of one evaluated (fold, sample) cell
#[derive(Debug, Clone)]
pub struct CellResult<'a> {
    pub task: &'a Task,
    pub dataset: &'a PreparedDataset,
    pub timestamp: DateTime<Utc>,
    pub repeat: u32,
    pub fold: u32,
    /// None when the split table has no sample dimension
    pub sample: Option<u32>,
    pub model: ModelHandle,
    pub config_key: String,
    /// Test row ids, aligned with `predictions`
    pub test_row_ids: Vec<usize>,
    pub predictions: Vec<Prediction>,
    pub raw_metrics: RawMetrics,
    pub measures: CanonicalMeasures,
    pub trace: Option<OptimizationTrace>,
    pub build_full_model: bool,
}

/// A cell the evaluator could not process
#[derive(Debug, Clone)]
pub struct ErrorResult<'a> {
    pub task: &'a Task,
    pub dataset: &'a PreparedDataset,
    pub repeat: u32,
    pub fold: u32,
    pub sample: Option<u32>,
    pub flavor: String,
    pub config_key: String,
    pub message: String,
}

/// Model trained and evaluated on the full dataset
#[derive(Debug, Clone)]
pub struct FullModelResult<'a> {
    pub task: &'a Task,
    pub dataset: &'a PreparedDataset,
    pub model: ModelHandle,
    pub config_key: String,
    pub measures: CanonicalMeasures,
    pub evaluator: EvaluatorDescriptor,
}

/// Consumer of evaluation results
pub trait ResultListener {
    fn accept_result(&mut self, result: CellResult<'_>) -> Result<()>;

    fn accept_error(&mut self, error: ErrorResult<'_>) -> Result<()>;

    fn accept_full_model(&mut self, result: FullModelResult<'_>) -> Result<()>;
}

impl<L: ResultListener + ?Sized> ResultListener for &mut L {
    fn accept_result(&mut self, result: CellResult<'_>) -> Result<()> {
        (**self).accept_result(result)
    }

    fn accept_error(&mut self, error: ErrorResult<'_>) -> Result<()> {
        (**self).accept_error(error)
    }

    fn accept_full_model(&mut self, result: FullModelResult<'_>) -> Result<()> {
        (**self).accept_full_model(result)
    }
}

impl<L: ResultListener + ?Sized> ResultListener for Box<L> {
    fn accept_result(&mut self, result: CellResult<'_>) -> Result<()> {
        (**self).accept_result(result)
    }

    fn accept_error(&mut self, error: ErrorResult<'_>) -> Result<()> {
        (**self).accept_error(error)
    }

    fn accept_full_model(&mut self, result: FullModelResult<'_>) -> Result<()> {
        (**self).accept_full_model(result)
    }
}

/// Owned copy of a [`CellResult`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResult {
    pub task_id: TaskId,
    pub dataset: String,
    pub timestamp: DateTime<Utc>,
    pub repeat: u32,
    pub fold: u32,
    pub sample: Option<u32>,
    pub model: ModelHandle,
    pub config_key: String,
    pub test_row_ids: Vec<usize>,
    pub predictions: Vec<Prediction>,
    pub raw_metrics: RawMetrics,
    pub measures: CanonicalMeasures,
    pub trace: Option<OptimizationTrace>,
    pub build_full_model: bool,
}

impl From<CellResult<'_>> for RecordedResult {
    fn from(result: CellResult<'_>) -> Self {
        Self {
            task_id: result.task.task_id,
            dataset: result.dataset.name().to_string(),
            timestamp: result.timestamp,
            repeat: result.repeat,
            fold: result.fold,
            sample: result.sample,
            model: result.model,
            config_key: result.config_key,
            test_row_ids: result.test_row_ids,
            predictions: result.predictions,
            raw_metrics: result.raw_metrics,
            measures: result.measures,
            trace: result.trace,
            build_full_model: result.build_full_model,
        }
    }
}

/// Owned copy of an [`ErrorResult`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedError {
    pub task_id: TaskId,
    pub repeat: u32,
    pub fold: u32,
    pub sample: Option<u32>,
    pub flavor: String,
    pub config_key: String,
    pub message: String,
}

impl From<ErrorResult<'_>> for RecordedError {
    fn from(error: ErrorResult<'_>) -> Self {
        Self {
            task_id: error.task.task_id,
            repeat: error.repeat,
            fold: error.fold,
            sample: error.sample,
            flavor: error.flavor,
            config_key: error.config_key,
            message: error.message,
        }
    }
}

/// Owned copy of a [`FullModelResult`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFullModel {
    pub task_id: TaskId,
    pub model: ModelHandle,
    pub config_key: String,
    pub measures: CanonicalMeasures,
    pub evaluator: EvaluatorDescriptor,
}

impl From<FullModelResult<'_>> for RecordedFullModel {
    fn from(result: FullModelResult<'_>) -> Self {
        Self {
            task_id: result.task.task_id,
            model: result.model,
            config_key: result.config_key,
            measures: result.measures,
            evaluator: result.evaluator,
        }
    }
}

/// Listener that keeps everything it receives in memory, in arrival order
#[derive(Debug, Clone, Default)]
pub struct CollectingListener {
    pub results: Vec<RecordedResult>,
    pub errors: Vec<RecordedError>,
    pub full_models: Vec<RecordedFullModel>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// (fold, sample) of each accepted result in arrival order
    pub fn cells(&self) -> Vec<(u32, Option<u32>)> {
        self.results.iter().map(|r| (r.fold, r.sample)).collect()
    }
}

impl ResultListener for CollectingListener {
    fn accept_result(&mut self, result: CellResult<'_>) -> Result<()> {
        self.results.push(result.into());
        Ok(())
    }

    fn accept_error(&mut self, error: ErrorResult<'_>) -> Result<()> {
        self.errors.push(error.into());
        Ok(())
    }

    fn accept_full_model(&mut self, result: FullModelResult<'_>) -> Result<()> {
        self.full_models.push(result.into());
        Ok(())
    }
}
