use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// One reply line. `id` is absent only when the request could not be read.
#[derive(Debug, Serialize)]
struct Reply<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

fn to_value(reply: Reply<'_>) -> serde_json::Value {
    serde_json::to_value(reply).unwrap_or_else(|_| serde_json::json!({ "ok": false }))
}

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    to_value(Reply {
        id: Some(id),
        ok: true,
        result: Some(result),
        error: None,
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    failure(Some(id), code, message.into(), details)
}

/// Reply for a line that was not a valid request.
pub fn bad_json(message: impl Into<String>) -> serde_json::Value {
    failure(None, "bad_json", message.into(), None)
}

fn failure(
    id: Option<&str>,
    code: &str,
    message: String,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    to_value(Reply {
        id,
        ok: false,
        result: None,
        error: Some(ErrorBody {
            code: code.to_string(),
            message,
            details,
        }),
    })
}
