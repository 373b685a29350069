//! Kolosal OpenML - Repeated cross-validation runner for OpenML tasks
//!
//! This crate evaluates a model against the predefined splits of an OpenML task:
//! - Rebuilding train/test partitions from a split table
//! - Running the evaluator on every (fold, sample) cell of a repeat
//! - Translating native metrics into canonical user measures
//! - Skipping work a run registry already knows about
//!
//! # Modules
//!
//! ## Inputs
//! - [`task`] - Task descriptions and estimation procedures
//! - [`data`] - Dataset preparation, split tables, file loading
//!
//! ## Core
//! - [`partition`] - Partition reconstruction per repeat
//! - [`evaluation`] - Evaluator capability, user measures, baseline evaluator
//! - [`registry`] - Run registry and duplicate-run guard
//! - [`runner`] - Repeat orchestration, result listeners and sinks
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Inputs
pub mod task;
pub mod data;

// Core
pub mod partition;
pub mod evaluation;
pub mod registry;
pub mod runner;

// Services
pub mod cli;

pub use error::{TaskRunError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{TaskRunError, Result};

    // Inputs
    pub use crate::task::{Task, TaskId, TaskType, SourceData, EstimationProcedure};
    pub use crate::data::{DataLoader, PreparedDataset, SplitRecord, SplitRole, SplitTable};

    // Partitioning
    pub use crate::partition::{PartitionBuilder, PartitionCell, Partitions, repeat_from_run_number};

    // Evaluation
    pub use crate::evaluation::{
        Evaluation, Evaluator, MajorityClassEvaluator, MetricTranslator, CanonicalMeasures,
        ModelHandle, Prediction, RawMetrics,
    };

    // Registry
    pub use crate::registry::{RunRegistry, DuplicateRunGuard, LocalRunRegistry, EmptyRegistry};

    // Runner
    pub use crate::runner::{
        TaskRunner, TaskContext, RunnerConfig, RepeatOutcome, ResultListener,
        CollectingListener, JsonLinesSink,
    };
}
