use crate::ipc::error::{err, ok};
use crate::ipc::helpers::optional_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dataPath": state.bridge.path().to_string_lossy(),
        }),
    )
}

async fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = optional_str(req, "path").map(PathBuf::from) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    if let Err(e) = tokio::fs::create_dir_all(&path).await {
        return err(
            &req.id,
            "workspace_failed",
            e.to_string(),
            Some(json!({ "path": path.to_string_lossy() })),
        );
    }

    tracing::info!(path = %path.display(), "data directory selected");
    state.select_data_dir(path);
    ok(
        &req.id,
        json!({
            "workspacePath": state.data_dir.to_string_lossy(),
            "dataPath": state.bridge.path().to_string_lossy(),
        }),
    )
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req).await),
        _ => None,
    }
}
