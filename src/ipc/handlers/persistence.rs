use crate::backup;
use crate::config::{BACKUP_FILE, CSV_FILE, DATA_FILE, DB_FILE};
use crate::db;
use crate::export;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{optional_str, path_or_workspace_file, required_str, workspace};
use crate::ipc::types::{AppState, Request};
use crate::ipc::views::counts_json;
use crate::snapshot;
use serde_json::json;
use std::path::PathBuf;

fn handle_save_json(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let path = path_or_workspace_file(state, req, "path", DATA_FILE)?;
    snapshot::save(&path, &state.registry)?;
    Ok(json!({ "path": path.to_string_lossy(), "counts": counts_json(&state.registry) }))
}

fn handle_load_json(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let path = path_or_workspace_file(state, req, "path", DATA_FILE)?;
    // Replace only once the whole document decoded.
    state.registry = snapshot::load(&path)?;
    Ok(json!({ "path": path.to_string_lossy(), "counts": counts_json(&state.registry) }))
}

fn handle_save_db(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let path = path_or_workspace_file(state, req, "path", DB_FILE)?;
    db::save_db(&path, &state.registry)?;
    Ok(json!({ "path": path.to_string_lossy(), "counts": counts_json(&state.registry) }))
}

fn handle_load_db(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let path = path_or_workspace_file(state, req, "path", DB_FILE)?;
    state.registry = db::load_db(&path)?;
    Ok(json!({ "path": path.to_string_lossy(), "counts": counts_json(&state.registry) }))
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let path = path_or_workspace_file(state, req, "outPath", CSV_FILE)?;
    let summary = export::export_csv(&path, &state.registry)?;
    Ok(json!({
        "path": path.to_string_lossy(),
        "rowsExported": summary.rows(),
    }))
}

fn handle_backup_copy_file(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let src = path_or_workspace_file(state, req, "inPath", DB_FILE)?;
    let dst = path_or_workspace_file(state, req, "outPath", BACKUP_FILE)?;
    let bytes = backup::backup_file(&src, &dst)?;
    Ok(json!({ "path": dst.to_string_lossy(), "bytes": bytes }))
}

fn workspace_param(state: &AppState, req: &Request) -> Result<PathBuf, HandlerErr> {
    match optional_str(req, "workspacePath")?.filter(|s| !s.is_empty()) {
        Some(p) => Ok(PathBuf::from(p)),
        None => Ok(workspace(state)?.to_path_buf()),
    }
}

fn handle_backup_export_bundle(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let out_path = required_str(req, "outPath")?;
    if out_path.is_empty() {
        return Err(HandlerErr::new("bad_params", "missing outPath"));
    }
    let workspace_path = workspace_param(state, req)?;

    let export = backup::export_workspace_bundle(&workspace_path, &PathBuf::from(&out_path))
        .map_err(|e| bundle_err(e, &out_path))?;

    Ok(json!({
        "path": out_path,
        "bundleFormat": export.bundle_format,
        "entryCount": export.entry_count
    }))
}

/// Payloads that failed to decode keep their own code, e.g. `malformed_document`.
fn bundle_err(e: anyhow::Error, path: &str) -> HandlerErr {
    let code = e
        .downcast_ref::<crate::RecordsError>()
        .map_or("io_failed", |r| r.code());
    HandlerErr::new(code, format!("{e:#}")).with_details(json!({ "path": path }))
}

fn handle_backup_import_bundle(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let in_path = required_str(req, "inPath")?;
    if in_path.is_empty() {
        return Err(HandlerErr::new("bad_params", "missing inPath"));
    }
    let workspace_path = workspace_param(state, req)?;

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(HandlerErr::new("file_not_found", "bundle file not found")
            .with_details(json!({ "path": in_path })));
    }

    let import = backup::import_workspace_bundle(&src, &workspace_path)
        .map_err(|e| bundle_err(e, &in_path))?;

    state.registry = import.registry;
    state.workspace = Some(workspace_path.clone());

    Ok(json!({
        "workspacePath": workspace_path.to_string_lossy(),
        "bundleFormatDetected": import.bundle_format_detected,
        "restored": import.restored,
        "counts": counts_json(&state.registry),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "data.saveJson" => handle_save_json(state, req),
        "data.loadJson" => handle_load_json(state, req),
        "data.saveDb" => handle_save_db(state, req),
        "data.loadDb" => handle_load_db(state, req),
        "data.exportCsv" => handle_export_csv(state, req),
        "backup.copyFile" => handle_backup_copy_file(state, req),
        "backup.exportBundle" => handle_backup_export_bundle(state, req),
        "backup.importBundle" => handle_backup_import_bundle(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
