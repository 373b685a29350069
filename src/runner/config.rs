//! Runner configuration

use crate::error::{Result, TaskRunError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Settings that control how a task is run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Do not ask the registry whether the run already exists
    pub skip_duplicate_check: bool,
    /// Also build a model on the full dataset
    pub model_full_dataset: bool,
    /// Overrides the number of repeats declared by the task
    pub num_repeats: Option<u32>,
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| TaskRunError::ConfigError(format!("{}: {}", path.display(), e)))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| TaskRunError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn with_skip_duplicate_check(mut self, skip: bool) -> Self {
        self.skip_duplicate_check = skip;
        self
    }

    pub fn with_model_full_dataset(mut self, enabled: bool) -> Self {
        self.model_full_dataset = enabled;
        self
    }

    pub fn with_num_repeats(mut self, repeats: u32) -> Self {
        self.num_repeats = Some(repeats);
        self
    }
}
