//! Local file system run registry
//!
//! Setups and runs are persisted as a single JSON document.

use super::{RunId, RunRegistry, SetupId};
use crate::error::{Result, TaskRunError};
use crate::task::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupRecord {
    pub setup_id: SetupId,
    pub flavor: String,
    pub config_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub task_id: TaskId,
    pub setup_id: SetupId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryState {
    #[serde(default)]
    setups: Vec<SetupRecord>,
    #[serde(default)]
    runs: Vec<RunRecord>,
}

/// Run registry stored in a local JSON file
#[derive(Debug)]
pub struct LocalRunRegistry {
    path: PathBuf,
    state: RegistryState,
}

impl LocalRunRegistry {
    /// Open the registry at `path`; a missing file starts an empty registry
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let file = File::open(&path)?;
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                TaskRunError::RegistryError(format!("{}: {}", path.display(), e))
            })?
        } else {
            RegistryState::default()
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn setups(&self) -> &[SetupRecord] {
        &self.state.setups
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.state.runs
    }

    /// Id of the setup for (flavor, configuration), registering it if new
    pub fn register_setup(&mut self, flavor: &str, config_key: &str) -> SetupId {
        if let Some(id) = self.find_setup(flavor, config_key) {
            return id;
        }
        let setup_id = self.state.setups.iter().map(|s| s.setup_id).max().unwrap_or(0) + 1;
        self.state.setups.push(SetupRecord {
            setup_id,
            flavor: flavor.to_string(),
            config_key: config_key.to_string(),
        });
        setup_id
    }

    /// Record a completed run and return its id
    pub fn record_run(&mut self, task_id: TaskId, setup_id: SetupId) -> RunId {
        let run_id = self.state.runs.iter().map(|r| r.run_id).max().unwrap_or(0) + 1;
        self.state.runs.push(RunRecord {
            run_id,
            task_id,
            setup_id,
            created_at: Utc::now(),
        });
        run_id
    }

    /// Write the registry back to its file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &self.state)?;
        writer.flush()?;
        Ok(())
    }

    fn find_setup(&self, flavor: &str, config_key: &str) -> Option<SetupId> {
        self.state
            .setups
            .iter()
            .find(|s| s.flavor == flavor && s.config_key == config_key)
            .map(|s| s.setup_id)
    }
}

impl RunRegistry for LocalRunRegistry {
    fn lookup_setup_id(&self, flavor: &str, config_key: &str) -> Result<Option<SetupId>> {
        Ok(self.find_setup(flavor, config_key))
    }

    fn find_runs(&self, task_id: TaskId, setup_id: SetupId) -> Result<Vec<RunId>> {
        Ok(self
            .state
            .runs
            .iter()
            .filter(|r| r.task_id == task_id && r.setup_id == setup_id)
            .map(|r| r.run_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = LocalRunRegistry::open(dir.path().join("runs.json")).unwrap();

        let a = registry.register_setup("kolosal.MajorityClass", "");
        let b = registry.register_setup("kolosal.MajorityClass", "");
        let c = registry.register_setup("kolosal.MajorityClass", "-K 3");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.setups().len(), 2);
    }

    #[test]
    fn test_runs_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("runs.json");

        let mut registry = LocalRunRegistry::open(&path).unwrap();
        let setup = registry.register_setup("J48", "-C 0.25");
        let run = registry.record_run(59, setup);
        registry.save().unwrap();

        let reopened = LocalRunRegistry::open(&path).unwrap();
        assert_eq!(reopened.lookup_setup_id("J48", "-C 0.25").unwrap(), Some(setup));
        assert_eq!(reopened.find_runs(59, setup).unwrap(), vec![run]);
        assert!(reopened.find_runs(60, setup).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_registry_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.json");
        fs::write(&path, "not json").unwrap();

        let err = LocalRunRegistry::open(&path).unwrap_err();
        assert!(matches!(err, TaskRunError::RegistryError(_)));
    }
}
