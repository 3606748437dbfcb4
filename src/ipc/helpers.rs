use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Request};
use std::path::{Path, PathBuf};

pub fn required_str(req: &Request, key: &str) -> Result<String, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {key}")))
}

pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, HandlerErr> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.trim().to_string()))
            .ok_or_else(|| HandlerErr::new("bad_params", format!("{key} must be a string"))),
    }
}

/// Accepts a JSON integer or a string holding one, as form fields arrive as text.
pub fn optional_i64(req: &Request, key: &str) -> Result<Option<i64>, HandlerErr> {
    let bad = || HandlerErr::new("bad_params", format!("{key} must be an integer"));
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => {
            if let Some(n) = v.as_i64() {
                return Ok(Some(n));
            }
            v.as_str()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map(Some)
                .ok_or_else(bad)
        }
    }
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, HandlerErr> {
    optional_i64(req, key)?.ok_or_else(|| HandlerErr::new("bad_params", format!("missing {key}")))
}

pub fn workspace(state: &AppState) -> Result<&Path, HandlerErr> {
    state
        .workspace
        .as_deref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// `params[key]` if given, else `file` inside the selected workspace.
pub fn path_or_workspace_file(
    state: &AppState,
    req: &Request,
    key: &str,
    file: &str,
) -> Result<PathBuf, HandlerErr> {
    match optional_str(req, key)?.filter(|s| !s.is_empty()) {
        Some(p) => Ok(PathBuf::from(p)),
        None => Ok(workspace(state)?.join(file)),
    }
}
