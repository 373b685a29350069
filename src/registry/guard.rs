//! Duplicate-run guard
//!
//! Registry failures never block a run: any lookup error counts as "not yet run".

use super::{RunId, RunRegistry};
use crate::task::TaskId;
use tracing::{debug, info, warn};

/// Checks whether a task was already run with the current setup
pub struct DuplicateRunGuard<'r, R: ?Sized> {
    registry: &'r R,
}

impl<'r, R: RunRegistry + ?Sized> DuplicateRunGuard<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self { registry }
    }

    /// Existing run ids for (task, setup), or None when the task should run
    pub fn already_run(&self, task_id: TaskId, flavor: &str, config_key: &str) -> Option<Vec<RunId>> {
        let setup_id = match self.registry.lookup_setup_id(flavor, config_key) {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!(flavor = %flavor, "Setup not registered, run is new");
                return None;
            }
            Err(e) => {
                warn!(flavor = %flavor, error = %e, "Setup lookup failed, assuming run is new");
                return None;
            }
        };

        match self.registry.find_runs(task_id, setup_id) {
            Ok(runs) if !runs.is_empty() => {
                info!(task_id, setup_id, run_ids = ?runs, "Run already available");
                Some(runs)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(task_id, setup_id, error = %e, "Run lookup failed, assuming run is new");
                None
            }
        }
    }
}
