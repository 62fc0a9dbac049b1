use crate::ipc::error::{err, ok};
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use serde_json::json;
use std::path::{Path, PathBuf};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let workspace_id = state.store.as_ref().and_then(|s| s.workspace_id().ok());
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "workspaceId": workspace_id,
        }),
    )
}

/// Open (creating if needed) the workspace at `path` and make it current.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<String> {
    let store = Store::open(path, state.config.busy_timeout)?;
    let workspace_id = store.workspace_id()?;
    tracing::info!(path = %path.display(), workspace_id = %workspace_id, "workspace opened");
    state.workspace = Some(path.to_path_buf());
    state.store = Some(store);
    Ok(workspace_id)
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = param_str(req, "path").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(workspace_id) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "workspaceId": workspace_id,
            }),
        ),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "workspace open failed");
            err(
                &req.id,
                "db_open_failed",
                format!("{e:#}"),
                Some(json!({ "path": path.to_string_lossy() })),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
