//! File-based step output store for the CLI.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use larder_core::pipeline::StepOutputStore;
use larder_core::StoreError;
use serde_json::Value as JsonValue;

/// File-based output store for CLI pipeline runs.
///
/// Stores step outputs as JSON files in a directory structure:
/// `run_dir/{step_name}/output.json`
///
/// Also caches outputs in memory to avoid redundant disk reads.
pub struct FileOutputStore {
    run_dir: PathBuf,
    /// In-memory cache to avoid disk round-trips
    cache: HashMap<String, JsonValue>,
}

impl FileOutputStore {
    pub fn new(run_dir: &Path) -> Self {
        Self {
            run_dir: run_dir.to_path_buf(),
            cache: HashMap::new(),
        }
    }

    fn step_dir(&self, step_name: &str) -> PathBuf {
        self.run_dir.join(step_name)
    }

    /// Get the output file path for a step.
    pub fn output_path(&self, step_name: &str) -> PathBuf {
        self.step_dir(step_name).join("output.json")
    }
}

impl StepOutputStore for FileOutputStore {
    fn get_output(&self, step_name: &str) -> Option<JsonValue> {
        // Check in-memory cache first
        if let Some(value) = self.cache.get(step_name) {
            return Some(value.clone());
        }

        // Fall back to disk (outputs of an earlier run in the same directory)
        let path = self.output_path(step_name);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring unreadable step output: {}", e);
                None
            }
        }
    }

    fn save_output(&mut self, step_name: &str, output: &JsonValue) -> Result<(), StoreError> {
        self.cache.insert(step_name.to_string(), output.clone());

        fs::create_dir_all(self.step_dir(step_name))?;
        let json = serde_json::to_string_pretty(output)?;
        fs::write(self.output_path(step_name), json)?;

        Ok(())
    }
}
