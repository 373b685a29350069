//! Task running
//!
//! [`TaskRunner`] drives the repeats of a task; results flow to a
//! [`ResultListener`] such as [`CollectingListener`] or [`JsonLinesSink`].

pub mod config;
pub mod listener;
pub mod orchestrator;
pub mod sink;

pub use config::RunnerConfig;
pub use listener::{
    CellResult, CollectingListener, ErrorResult, FullModelResult, RecordedError,
    RecordedFullModel, RecordedResult, ResultListener,
};
pub use orchestrator::{RepeatOutcome, RepeatState, TaskContext, TaskRunner};
pub use sink::{ColumnType, DeferredFile, JsonLinesSink, ResultSchema, TASK_RESULT_SCHEMA};
