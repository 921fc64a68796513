use crate::ipc::error::{err, ok};
use crate::ipc::helpers::param;
use crate::ipc::types::{AppState, Request};
use gradetrackd::bridge::DataBridge;
use serde_json::json;

async fn handle_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.bridge.load_data().await {
        Ok(data) => ok(&req.id, json!({ "data": data })),
        Err(e) => err(&req.id, "load_failed", e.to_string(), None),
    }
}

async fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data: String = match param(req, "data") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    // Refuse to overwrite the file with something that will not load back.
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&data) {
        return err(
            &req.id,
            "bad_params",
            "params.data is not valid JSON",
            Some(json!({ "parseError": e.to_string() })),
        );
    }

    let bytes = data.len();
    match state.bridge.save_data(data).await {
        Ok(()) => ok(&req.id, json!({ "bytes": bytes })),
        Err(e) => {
            tracing::error!(error = %e, "data.save failed");
            err(
                &req.id,
                "save_failed",
                e.to_string(),
                Some(json!({ "path": state.bridge.path().to_string_lossy() })),
            )
        }
    }
}

async fn handle_location(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.bridge.data_location().await {
        Ok(location) => ok(&req.id, json!({ "location": location })),
        Err(e) => err(&req.id, "location_failed", e.to_string(), None),
    }
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "data.load" => Some(handle_load(state, req).await),
        "data.save" => Some(handle_save(state, req).await),
        "data.location" => Some(handle_location(state, req).await),
        _ => None,
    }
}
