//! Partition reconstruction from a split table
//!
//! For one repeat, every (fold, sample) cell receives the rows the split table
//! assigns to it, in the order the table lists them. The table is scanned once;
//! frames are materialized per cell afterwards.

use crate::data::splits::{SplitRole, SplitTable};
use crate::error::{Result, TaskRunError};
use polars::prelude::*;

/// Convert a 1-based run number into the 0-based repeat index stored in split tables
pub fn repeat_from_run_number(run: u32) -> Result<u32> {
    run.checked_sub(1).ok_or_else(|| {
        TaskRunError::ConfigError("run numbers are 1-based; got 0".to_string())
    })
}

/// Train/test subsets of one (fold, sample) cell
#[derive(Debug, Clone)]
pub struct PartitionCell {
    pub fold: u32,
    pub sample: u32,
    pub train: DataFrame,
    pub test: DataFrame,
    pub train_row_ids: Vec<usize>,
    /// Test row ids in split-table order; predictions follow this order
    pub test_row_ids: Vec<usize>,
}

impl PartitionCell {
    pub fn len(&self) -> usize {
        self.train.height() + self.test.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All cells of one repeat, stored fold-major
#[derive(Debug, Clone)]
pub struct Partitions {
    repeat: u32,
    num_folds: u32,
    num_samples: u32,
    cells: Vec<PartitionCell>,
}

impl Partitions {
    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn num_folds(&self) -> u32 {
        self.num_folds
    }

    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    pub fn cell(&self, fold: u32, sample: u32) -> Option<&PartitionCell> {
        if fold >= self.num_folds || sample >= self.num_samples {
            return None;
        }
        self.cells.get(cell_index(fold, sample, self.num_samples))
    }

    /// Cells in (fold, sample) row-major order
    pub fn iter(&self) -> impl Iterator<Item = &PartitionCell> {
        self.cells.iter()
    }

    /// Consume the partitions, yielding cells in (fold, sample) row-major order
    pub fn into_cells(self) -> std::vec::IntoIter<PartitionCell> {
        self.cells.into_iter()
    }

    /// Total number of rows placed across all cells and roles
    pub fn assigned_rows(&self) -> usize {
        self.cells.iter().map(PartitionCell::len).sum()
    }
}

/// Builds the train/test cells of a repeat
#[derive(Debug, Clone, Copy)]
pub struct PartitionBuilder {
    num_folds: u32,
    num_samples: u32,
}

impl PartitionBuilder {
    /// Create a builder for a `num_folds × num_samples` grid
    pub fn new(num_folds: u32, num_samples: u32) -> Self {
        Self {
            num_folds,
            num_samples,
        }
    }

    /// Reconstruct every cell of `repeat` (0-based)
    ///
    /// Train and test records outside the configured grid or pointing past the
    /// end of the dataset fail the whole build. Records with any other role are
    /// skipped without validation.
    pub fn build(&self, dataset: &DataFrame, splits: &SplitTable, repeat: u32) -> Result<Partitions> {
        if self.num_folds == 0 || self.num_samples == 0 {
            return Err(TaskRunError::ConfigError(format!(
                "partition grid must be non-empty, got {} folds x {} samples",
                self.num_folds, self.num_samples
            )));
        }

        let n_cells = self.num_folds.checked_mul(self.num_samples).ok_or_else(|| {
            TaskRunError::ConfigError(format!(
                "partition grid of {} folds x {} samples is too large",
                self.num_folds, self.num_samples
            ))
        })? as usize;
        let mut train: Vec<Vec<usize>> = vec![Vec::new(); n_cells];
        let mut test: Vec<Vec<usize>> = vec![Vec::new(); n_cells];
        let height = dataset.height();

        for (i, record) in splits.records().iter().enumerate() {
            if record.repeat != repeat {
                continue;
            }
            let selection = match record.role {
                SplitRole::Train => &mut train,
                SplitRole::Test => &mut test,
                SplitRole::Other => continue,
            };
            let sample = record.sample_index();
            if record.fold >= self.num_folds {
                return Err(TaskRunError::SplitError(format!(
                    "record {} has fold {}, task declares {} folds",
                    i, record.fold, self.num_folds
                )));
            }
            if sample >= self.num_samples {
                return Err(TaskRunError::SplitError(format!(
                    "record {} has sample {}, task declares {} samples",
                    i, sample, self.num_samples
                )));
            }
            if record.row_id >= height {
                return Err(TaskRunError::SplitError(format!(
                    "record {} references row {}, dataset has {} rows",
                    i, record.row_id, height
                )));
            }

            selection[cell_index(record.fold, sample, self.num_samples)].push(record.row_id);
        }

        let mut cells = Vec::with_capacity(n_cells);
        for (idx, (train_row_ids, test_row_ids)) in train.into_iter().zip(test).enumerate() {
            let idx = idx as u32;
            cells.push(PartitionCell {
                fold: idx / self.num_samples,
                sample: idx % self.num_samples,
                train: take_rows(dataset, &train_row_ids)?,
                test: take_rows(dataset, &test_row_ids)?,
                train_row_ids,
                test_row_ids,
            });
        }

        Ok(Partitions {
            repeat,
            num_folds: self.num_folds,
            num_samples: self.num_samples,
            cells,
        })
    }
}

fn cell_index(fold: u32, sample: u32, num_samples: u32) -> usize {
    fold as usize * num_samples as usize + sample as usize
}

fn take_rows(dataset: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let indices = rows
        .iter()
        .map(|&row| {
            IdxSize::try_from(row).map_err(|_| {
                TaskRunError::SplitError(format!("row id {} exceeds the index range", row))
            })
        })
        .collect::<Result<Vec<IdxSize>>>()?;
    let indices = IdxCa::from_vec("rowid".into(), indices);
    Ok(dataset.take(&indices)?)
}
