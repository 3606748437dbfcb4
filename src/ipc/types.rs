use std::path::PathBuf;

use crate::registry::Registry;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub registry: Registry,
}

impl AppState {
    /// Selects `path` as the workspace, creating it if needed. The registry is
    /// replaced by the snapshot there, or emptied when there is none; if the
    /// snapshot can't be read, nothing changes. Returns whether a snapshot
    /// was loaded.
    pub fn open_workspace(&mut self, path: PathBuf) -> crate::Result<bool> {
        std::fs::create_dir_all(&path).map_err(|e| crate::RecordsError::write(&path, e))?;
        let data = crate::config::data_path(&path);
        let loaded = if data.is_file() {
            self.registry = crate::snapshot::load(&data)?;
            true
        } else {
            self.registry.reset();
            false
        };
        tracing::info!(workspace = %path.display(), loaded, "workspace selected");
        self.workspace = Some(path);
        Ok(loaded)
    }
}
