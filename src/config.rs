use std::path::{Path, PathBuf};

/// JSON snapshot inside a workspace.
pub const DATA_FILE: &str = "school.json";
/// SQLite store inside a workspace.
pub const DB_FILE: &str = "school.sqlite3";
pub const CSV_FILE: &str = "school_records.csv";
pub const BACKUP_FILE: &str = "backup_school.sqlite3";

pub const WORKSPACE_ENV: &str = "SCHOOLD_WORKSPACE";
pub const LOG_ENV: &str = "SCHOOLD_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workspace selected at startup; its snapshot is loaded if present.
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            workspace: non_empty(WORKSPACE_ENV).map(PathBuf::from),
            log_filter: non_empty(LOG_ENV).unwrap_or(defaults.log_filter),
        }
    }
}

pub fn data_path(workspace: &Path) -> PathBuf {
    workspace.join(DATA_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn reads_workspace_and_filter() {
        let env: HashMap<&str, &str> =
            HashMap::from([(WORKSPACE_ENV, "/tmp/school"), (LOG_ENV, "schoold=debug")]);
        let cfg = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/school")));
        assert_eq!(cfg.log_filter, "schoold=debug");
    }

    #[test]
    fn blank_values_are_ignored() {
        let cfg = Config::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(cfg, Config::default());
    }
}
