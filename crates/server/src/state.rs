//! Shared application state

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use spray_orchestrator::SimulationRunner;

/// Shared application state
pub struct AppState {
    /// Active simulations (ID -> Runner)
    pub simulations: Mutex<HashMap<String, SimulationRunner>>,
    /// Path to configs directory
    pub configs_dir: PathBuf,
    /// Root for per-simulation frame directories, served under `/frames`
    pub frames_dir: PathBuf,
}

impl AppState {
    /// Create new application state
    pub fn new(configs_dir: PathBuf, frames_dir: PathBuf) -> Self {
        Self {
            simulations: Mutex::new(HashMap::new()),
            configs_dir,
            frames_dir,
        }
    }

    /// Lock the simulation table. A panic in another handler does not
    /// invalidate the runners, so poisoning is ignored.
    pub fn simulations(&self) -> MutexGuard<'_, HashMap<String, SimulationRunner>> {
        self.simulations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path of a named config, with traversal characters stripped
    pub fn config_path(&self, name: &str) -> PathBuf {
        let safe_name = name.replace("..", "").replace('/', "");
        self.configs_dir.join(format!("{}.json", safe_name))
    }
}
