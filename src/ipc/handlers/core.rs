use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::counts_json;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
        "counts": counts_json(&state.registry),
    }))
}

fn handle_workspace_select(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let path = required_str(req, "path")?;
    if path.is_empty() {
        return Err(HandlerErr::new("bad_params", "missing params.path"));
    }
    let path = PathBuf::from(path);
    let loaded = state.open_workspace(path.clone())?;
    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "loaded": loaded,
        "counts": counts_json(&state.registry),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
