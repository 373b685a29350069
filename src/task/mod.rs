//! OpenML task descriptions
//!
//! A task names the source dataset, the target feature, and the estimation
//! procedure (repeats, folds, samples, split table location).

use crate::error::{Result, TaskRunError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric task identifier as assigned by OpenML
pub type TaskId = u32;

/// OpenML task type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    SupervisedClassification,
    SupervisedRegression,
    LearningCurve,
    #[serde(other)]
    Other,
}

impl TaskType {
    /// Map an OpenML task type id
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => TaskType::SupervisedClassification,
            2 => TaskType::SupervisedRegression,
            3 => TaskType::LearningCurve,
            _ => TaskType::Other,
        }
    }

    /// Learning curves are classification tasks with a sample dimension
    pub fn is_classification(&self) -> bool {
        matches!(self, TaskType::SupervisedClassification | TaskType::LearningCurve)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::SupervisedClassification => "supervised classification",
            TaskType::SupervisedRegression => "supervised regression",
            TaskType::LearningCurve => "learning curve",
            TaskType::Other => "other",
        };
        f.write_str(name)
    }
}

/// Reference to the dataset a task is defined on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceData {
    pub dataset_id: u32,
    pub name: String,
    pub target_feature: String,
    #[serde(default)]
    pub ignore_attributes: Vec<String>,
    #[serde(default)]
    pub row_id_attribute: Option<String>,
}

/// Estimation procedure: how many repeats, folds and samples, and where the splits live
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimationProcedure {
    #[serde(default)]
    pub number_repeats: Option<u32>,
    #[serde(default)]
    pub number_folds: Option<u32>,
    #[serde(default)]
    pub number_samples: Option<u32>,
    #[serde(default)]
    pub data_splits_url: Option<String>,
}

/// An OpenML task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub source_data: SourceData,
    #[serde(default)]
    pub estimation_procedure: EstimationProcedure,
}

impl Task {
    /// Create a minimal task; estimation settings default to a single fold, repeat and sample
    pub fn new(task_id: TaskId, task_type: TaskType, source_data: SourceData) -> Self {
        Self {
            task_id,
            task_type,
            source_data,
            estimation_procedure: EstimationProcedure::default(),
        }
    }

    /// Set the number of folds
    pub fn with_folds(mut self, folds: u32) -> Self {
        self.estimation_procedure.number_folds = Some(folds);
        self
    }

    /// Set the number of repeats
    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.estimation_procedure.number_repeats = Some(repeats);
        self
    }

    /// Set the number of samples
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.estimation_procedure.number_samples = Some(samples);
        self
    }

    pub fn num_folds(&self) -> u32 {
        self.estimation_procedure.number_folds.unwrap_or(1)
    }

    pub fn num_samples(&self) -> u32 {
        self.estimation_procedure.number_samples.unwrap_or(1)
    }

    /// Number of repeats, if the task declares it. Callers choose the default.
    pub fn num_repeats(&self) -> Option<u32> {
        self.estimation_procedure.number_repeats
    }

    /// Reject task types the runner cannot evaluate
    pub fn ensure_supported(&self) -> Result<()> {
        if self.task_type.is_classification() {
            Ok(())
        } else {
            Err(TaskRunError::UnsupportedTaskType(format!(
                "task {} is a {} task; only classification tasks are supported",
                self.task_id, self.task_type
            )))
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task {} ({})", self.task_id, self.source_data.name)
    }
}
