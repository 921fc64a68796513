use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub async fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::data::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::grade::try_handle(&req) {
        return resp;
    }
    if let Some(resp) = handlers::outline::try_handle(state, &req).await {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
