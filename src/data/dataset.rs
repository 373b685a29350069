//! Dataset preparation for a task
//!
//! The source frame is stripped of ignored attributes and the row-id attribute
//! before any partitioning happens. Missing labels are detected on the full
//! target column first.

use crate::error::{Result, TaskRunError};
use crate::task::SourceData;
use polars::prelude::*;
use tracing::info;

/// A dataset ready for partitioning
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    name: String,
    frame: DataFrame,
    target: String,
    missing_labels: bool,
}

impl PreparedDataset {
    /// Prepare `frame` according to the task's source data description
    pub fn prepare(frame: DataFrame, source: &SourceData) -> Result<Self> {
        let target = source.target_feature.clone();
        let missing_labels = frame
            .column(&target)
            .map_err(|_| {
                TaskRunError::ConfigError(format!(
                    "target attribute '{}' not found in dataset '{}'",
                    target, source.name
                ))
            })?
            .null_count()
            > 0;

        let mut frame = frame;
        let removals = source
            .ignore_attributes
            .iter()
            .chain(source.row_id_attribute.iter());
        for name in removals {
            frame = drop_attribute(&frame, name)?;
        }

        if frame.column(&target).is_err() {
            return Err(TaskRunError::ConfigError(format!(
                "target attribute '{}' was removed from dataset '{}'",
                target, source.name
            )));
        }

        Ok(Self {
            name: source.name.clone(),
            frame,
            target,
            missing_labels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether the target had any missing values before attribute removal
    pub fn missing_labels(&self) -> bool {
        self.missing_labels
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Attribute names in column order
    pub fn attribute_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }
}

fn drop_attribute(frame: &DataFrame, name: &str) -> Result<DataFrame> {
    let index = frame
        .get_column_names()
        .iter()
        .position(|column| column.as_str() == name)
        .ok_or_else(|| {
            TaskRunError::ConfigError(format!("attribute '{}' to remove is not present", name))
        })?;
    info!(attribute = %name, index = index + 1, "Removing attribute");
    Ok(frame.drop(name)?)
}
