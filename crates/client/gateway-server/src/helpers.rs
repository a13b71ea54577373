use hyper::{header, Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};

pub(crate) fn internal_error_response() -> Response<String> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(r#"{"error":"Internal Server Error"}"#.to_string())
        .expect("Failed to build INTERNAL_SERVER_ERROR response with a valid status and body")
}

/// JSON response with the given status. Serialization failure degrades to a
/// 500.
pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<String> {
    let body = match serde_json::to_string_pretty(body) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Failed to serialize response body: {e}");
            return internal_error_response();
        }
    };
    match Response::builder().status(status).header(header::CONTENT_TYPE, "application/json").body(body) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to build response: {e}");
            internal_error_response()
        }
    }
}

/// The REST error envelope: `{"error": "<message>"}`.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<String> {
    tracing::error!("<-- [{status}]: {message}");
    json_response(status, &serde_json::json!({ "error": message }))
}

/// Parse a request body as a JSON object, falling back to YAML. An empty body
/// is an empty object; anything that parses to a non-object is rejected.
pub(crate) fn yaml_or_json_payload(body: &[u8]) -> Result<Map<String, Value>, String> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Map::new());
    }
    let parsed: Option<Value> =
        serde_json::from_slice(body).ok().or_else(|| serde_yaml::from_slice(body).ok());
    match parsed {
        Some(Value::Object(map)) => Ok(map),
        _ => Err("Unable to parse as YAML or JSON".to_owned()),
    }
}
