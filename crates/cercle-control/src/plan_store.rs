// Client-local plan storage. One JSON document per run id, written once at
// launch. Only the template id and step list persist; the current position
// is always recomputed from live state.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use cercle_types::RunPlanInstance;

#[derive(Debug, Error)]
pub enum PlanStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid plan document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no usable data directory for plan storage")]
    NoDataDir,
}

/// Keyed store for run plan instances.
pub struct PlanStore {
    base_dir: PathBuf,
}

impl PlanStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, PlanStoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Store rooted in the platform data directory.
    pub fn open_default() -> Result<Self, PlanStoreError> {
        let base = dirs::data_dir().ok_or(PlanStoreError::NoDataDir)?;
        Self::new(base.join("cercle").join("run_plans"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn key_path(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(format!("run_plan_{}.json", run_id))
    }

    pub fn save(&self, run_id: &str, instance: &RunPlanInstance) -> Result<(), PlanStoreError> {
        let content = serde_json::to_string_pretty(instance)?;
        atomic_write(&self.key_path(run_id), &content)?;
        Ok(())
    }

    /// Load the plan for a run. A missing key is an absent value, not an
    /// error. Documents from older writers may carry a stored step index;
    /// it is discarded on read.
    pub fn load(&self, run_id: &str) -> Result<Option<RunPlanInstance>, PlanStoreError> {
        let path = self.key_path(run_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let instance = serde_json::from_str(&content)?;
        Ok(Some(instance))
    }

    pub fn delete(&self, run_id: &str) -> Result<(), PlanStoreError> {
        let path = self.key_path(run_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)
}
