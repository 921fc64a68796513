use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, param};
use crate::ipc::types::{AppState, Request};
use gradetrackd::outline::{ImportError, OutlineClient, ParsedCourse, AI_MODELS};
use serde_json::json;

fn import_error_code(e: &ImportError) -> &'static str {
    match e {
        ImportError::MissingApiKey => "missing_api_key",
        ImportError::Http(_) => "ai_request_failed",
        ImportError::Status { .. } => "ai_bad_status",
        ImportError::EmptyReply => "ai_empty_reply",
        ImportError::Parse(_) => "ai_parse_failed",
    }
}

fn handle_models(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "models": AI_MODELS, "defaultModel": state.config.ai_model }),
    )
}

async fn handle_parse(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(text) = optional_str(req, "text") else {
        return err(&req.id, "bad_params", "missing params.text", None);
    };
    let api_key = optional_str(req, "apiKey")
        .map(str::to_string)
        .or_else(|| state.config.groq_api_key.clone())
        .unwrap_or_default();
    let model = optional_str(req, "model").unwrap_or(&state.config.ai_model);

    let client = match OutlineClient::new(&state.config.groq_api_url, &api_key) {
        Ok(c) => c,
        Err(e) => return err(&req.id, import_error_code(&e), e.to_string(), None),
    };
    match client.parse_outline(text, model).await {
        Ok(courses) => ok(&req.id, json!({ "courses": courses })),
        Err(e) => {
            let details = match &e {
                ImportError::Status { status, .. } => Some(json!({ "status": status })),
                _ => None,
            };
            err(&req.id, import_error_code(&e), e.to_string(), details)
        }
    }
}

fn handle_convert(req: &Request) -> serde_json::Value {
    let parsed: ParsedCourse = match param(req, "course") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scheme_index = req
        .params
        .get("schemeIndex")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;
    ok(&req.id, json!({ "course": parsed.into_course(scheme_index) }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "outline.models" => Some(handle_models(state, req)),
        "outline.parse" => Some(handle_parse(state, req).await),
        "outline.convert" => Some(handle_convert(req)),
        _ => None,
    }
}
