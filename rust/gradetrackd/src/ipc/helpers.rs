use crate::ipc::error::err;
use crate::ipc::types::Request;
use serde::de::DeserializeOwned;

/// Deserializes `params.<name>`, or builds the `bad_params` reply.
pub fn param<T: DeserializeOwned>(req: &Request, name: &str) -> Result<T, serde_json::Value> {
    let Some(raw) = req.params.get(name) else {
        return Err(err(&req.id, "bad_params", format!("missing params.{name}"), None));
    };
    serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid params.{name}: {e}"),
            None,
        )
    })
}

pub fn optional_str<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
