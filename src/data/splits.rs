//! Split table: externally supplied train/test assignments
//!
//! One record per instance-in-a-partition. The column names are fixed by the
//! data source and must not be renamed.

use crate::error::{Result, TaskRunError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TYPE_COLUMN: &str = "type";
pub const ROWID_COLUMN: &str = "rowid";
pub const FOLD_COLUMN: &str = "fold";
pub const REPEAT_COLUMN: &str = "repeat";
pub const SAMPLE_COLUMN: &str = "sample";

/// Role of a row within one partition cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitRole {
    Train,
    Test,
    /// Any label other than TRAIN/TEST; ignored by partitioning
    Other,
}

impl SplitRole {
    /// Parse a `type` label. Matching is exact.
    pub fn from_label(label: &str) -> Self {
        match label {
            "TRAIN" => SplitRole::Train,
            "TEST" => SplitRole::Test,
            _ => SplitRole::Other,
        }
    }
}

/// A single split assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecord {
    pub repeat: u32,
    pub fold: u32,
    pub sample: Option<u32>,
    pub role: SplitRole,
    pub row_id: usize,
}

impl SplitRecord {
    pub fn new(repeat: u32, fold: u32, sample: Option<u32>, role: SplitRole, row_id: usize) -> Self {
        Self {
            repeat,
            fold,
            sample,
            role,
            row_id,
        }
    }

    /// Sample index, 0 when the table has no sample dimension
    pub fn sample_index(&self) -> u32 {
        self.sample.unwrap_or(0)
    }
}

/// Immutable, ordered table of split records
#[derive(Debug, Clone, Default)]
pub struct SplitTable {
    records: Vec<SplitRecord>,
    has_samples: bool,
}

impl SplitTable {
    /// Build a table from records. `has_samples` records whether the source had a sample column.
    pub fn new(records: Vec<SplitRecord>, has_samples: bool) -> Self {
        Self {
            records,
            has_samples,
        }
    }

    /// Read a split table from a frame with columns `type`, `rowid`, `fold`, `repeat` and
    /// optionally `sample`
    pub fn from_frame(frame: &DataFrame) -> Result<Self> {
        let roles = label_column(frame, TYPE_COLUMN)?;
        let row_ids = int_column(frame, ROWID_COLUMN)?;
        let folds = int_column(frame, FOLD_COLUMN)?;
        let repeats = int_column(frame, REPEAT_COLUMN)?;
        let has_samples = frame.column(SAMPLE_COLUMN).is_ok();
        let samples = if has_samples {
            Some(int_column(frame, SAMPLE_COLUMN)?)
        } else {
            None
        };

        let mut records = Vec::with_capacity(frame.height());
        for i in 0..frame.height() {
            records.push(SplitRecord {
                repeat: to_u32(repeats[i], REPEAT_COLUMN, i)?,
                fold: to_u32(folds[i], FOLD_COLUMN, i)?,
                sample: match &samples {
                    Some(values) => Some(to_u32(values[i], SAMPLE_COLUMN, i)?),
                    None => None,
                },
                role: roles[i],
                row_id: usize::try_from(row_ids[i]).map_err(|_| {
                    TaskRunError::SplitError(format!("negative rowid {} at record {}", row_ids[i], i))
                })?,
            });
        }

        Ok(Self::new(records, has_samples))
    }

    pub fn records(&self) -> &[SplitRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the table carries a sample dimension
    pub fn has_samples(&self) -> bool {
        self.has_samples
    }

    /// Distinct repeat indices, ascending
    pub fn repeats(&self) -> BTreeSet<u32> {
        self.records.iter().map(|r| r.repeat).collect()
    }

    /// Number of TRAIN/TEST records for `repeat`
    pub fn assigned_in_repeat(&self, repeat: u32) -> usize {
        self.records
            .iter()
            .filter(|r| r.repeat == repeat && r.role != SplitRole::Other)
            .count()
    }

    /// Per-repeat summary: (max fold + 1, max sample + 1, train records, test records)
    pub fn summary(&self, repeat: u32) -> SplitSummary {
        let mut summary = SplitSummary::default();
        for record in self.records.iter().filter(|r| r.repeat == repeat) {
            summary.folds = summary.folds.max(record.fold + 1);
            summary.samples = summary.samples.max(record.sample_index() + 1);
            match record.role {
                SplitRole::Train => summary.train += 1,
                SplitRole::Test => summary.test += 1,
                SplitRole::Other => summary.ignored += 1,
            }
        }
        summary
    }
}

/// Counts for one repeat of a split table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    pub folds: u32,
    pub samples: u32,
    pub train: usize,
    pub test: usize,
    pub ignored: usize,
}

fn missing_column(name: &str) -> TaskRunError {
    TaskRunError::SplitError(format!("split table has no '{}' column", name))
}

fn int_column(frame: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let column = frame
        .column(name)
        .map_err(|_| missing_column(name))?
        .cast(&DataType::Int64)?;
    column
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            value.ok_or_else(|| {
                TaskRunError::SplitError(format!("missing '{}' value at record {}", name, i))
            })
        })
        .collect()
}

fn label_column(frame: &DataFrame, name: &str) -> Result<Vec<SplitRole>> {
    let column = frame
        .column(name)
        .map_err(|_| missing_column(name))?
        .cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|label| label.map_or(SplitRole::Other, SplitRole::from_label))
        .collect())
}

fn to_u32(value: i64, column: &str, record: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        TaskRunError::SplitError(format!(
            "invalid '{}' value {} at record {}",
            column, value, record
        ))
    })
}
