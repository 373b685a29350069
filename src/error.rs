//! Error types for the OpenML task runner

use thiserror::Error;

/// Result type alias for task runner operations
pub type Result<T> = std::result::Result<T, TaskRunError>;

/// Main error type for the task runner
#[derive(Error, Debug)]
pub enum TaskRunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported task type: {0}")]
    UnsupportedTaskType(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Split table error: {0}")]
    SplitError(String),

    /// The evaluator cannot consume the given train/test data
    #[error("Unsupported data: {0}")]
    UnsupportedData(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Trace extraction error: {0}")]
    TraceError(String),

    #[error("Listener error: {0}")]
    ListenerError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl TaskRunError {
    /// Whether this failure is local to one partition cell
    pub fn is_unsupported_data(&self) -> bool {
        matches!(self, TaskRunError::UnsupportedData(_))
    }

    /// Whether this failure must abort the whole run before any partition work
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TaskRunError::ConfigError(_) | TaskRunError::UnsupportedTaskType(_)
        )
    }

    /// Whether the result destination itself failed
    pub fn is_output(&self) -> bool {
        matches!(
            self,
            TaskRunError::ListenerError(_)
                | TaskRunError::IoError(_)
                | TaskRunError::SerializationError(_)
        )
    }
}

impl From<polars::error::PolarsError> for TaskRunError {
    fn from(err: polars::error::PolarsError) -> Self {
        TaskRunError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TaskRunError {
    fn from(err: serde_json::Error) -> Self {
        TaskRunError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaskRunError::SplitError("fold 3 out of range".to_string());
        assert_eq!(err.to_string(), "Split table error: fold 3 out of range");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TaskRunError = io_err.into();
        assert!(matches!(err, TaskRunError::IoError(_)));
    }

    #[test]
    fn test_error_kinds() {
        assert!(TaskRunError::UnsupportedData("string attribute".into()).is_unsupported_data());
        assert!(!TaskRunError::EvaluationError("boom".into()).is_unsupported_data());
        assert!(TaskRunError::UnsupportedTaskType("regression".into()).is_configuration());
        assert!(!TaskRunError::RegistryError("timeout".into()).is_configuration());
        assert!(TaskRunError::ListenerError("sink closed".into()).is_output());
        assert!(!TaskRunError::EvaluationError("boom".into()).is_output());
    }
}
