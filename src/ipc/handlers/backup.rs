use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::core::open_workspace;
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_backup_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(out_path) = param_str(req, "outPath").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };
    let workspace_path = param_str(req, "workspacePath")
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone());
    let Some(workspace_path) = workspace_path else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Some(store) = state.store.as_ref() {
        let _ = store
            .connection()
            .execute_batch("PRAGMA wal_checkpoint(FULL)");
    }

    let out = PathBuf::from(&out_path);
    let export = match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "export failed");
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": out_path })),
            );
        }
    };

    ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "bundleId": export.bundle_id,
            "dbSha256": export.db_sha256,
            "entryCount": export.entry_count
        }),
    )
}

fn handle_backup_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(in_path) = param_str(req, "inPath").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };
    let workspace_path = param_str(req, "workspacePath")
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone());
    let Some(workspace_path) = workspace_path else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Drop open handle before replacing file.
    state.store = None;

    let import = match backup::import_workspace_bundle(&src, &workspace_path) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "import failed");
            // The previous database is untouched on failure; reopen it.
            let reopened = open_workspace(state, &workspace_path).is_ok();
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({
                    "path": src.to_string_lossy(),
                    "workspaceReopened": reopened,
                })),
            );
        }
    };

    match open_workspace(state, &workspace_path) {
        Ok(workspace_id) => ok(
            &req.id,
            json!({
                "workspacePath": workspace_path.to_string_lossy(),
                "workspaceId": workspace_id,
                "bundleFormatDetected": import.bundle_format_detected,
                "bundleId": import.bundle_id,
            }),
        ),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_backup_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_backup_import_workspace_bundle(state, req)),
        _ => None,
    }
}
