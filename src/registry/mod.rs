//! Run registry
//!
//! A registry knows which setups (model flavor plus configuration) exist and
//! which runs were already performed for a task with a given setup.

pub mod guard;
pub mod local;

pub use guard::DuplicateRunGuard;
pub use local::LocalRunRegistry;

use crate::error::Result;
use crate::task::TaskId;

pub type SetupId = u32;
pub type RunId = u32;

/// Lookup of setups and previously performed runs
pub trait RunRegistry {
    /// Stable id of the setup for (flavor, configuration), if registered
    fn lookup_setup_id(&self, flavor: &str, config_key: &str) -> Result<Option<SetupId>>;

    /// Runs recorded for `task_id` with `setup_id`
    fn find_runs(&self, task_id: TaskId, setup_id: SetupId) -> Result<Vec<RunId>>;
}

impl<R: RunRegistry + ?Sized> RunRegistry for &R {
    fn lookup_setup_id(&self, flavor: &str, config_key: &str) -> Result<Option<SetupId>> {
        (**self).lookup_setup_id(flavor, config_key)
    }

    fn find_runs(&self, task_id: TaskId, setup_id: SetupId) -> Result<Vec<RunId>> {
        (**self).find_runs(task_id, setup_id)
    }
}

impl<R: RunRegistry + ?Sized> RunRegistry for Box<R> {
    fn lookup_setup_id(&self, flavor: &str, config_key: &str) -> Result<Option<SetupId>> {
        (**self).lookup_setup_id(flavor, config_key)
    }

    fn find_runs(&self, task_id: TaskId, setup_id: SetupId) -> Result<Vec<RunId>> {
        (**self).find_runs(task_id, setup_id)
    }
}

/// Registry that knows no setups; every run is new
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRegistry;

impl RunRegistry for EmptyRegistry {
    fn lookup_setup_id(&self, _flavor: &str, _config_key: &str) -> Result<Option<SetupId>> {
        Ok(None)
    }

    fn find_runs(&self, _task_id: TaskId, _setup_id: SetupId) -> Result<Vec<RunId>> {
        Ok(Vec::new())
    }
}
