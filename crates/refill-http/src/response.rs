//! Response body decoding and backend error mapping.

use serde_json::{Map, Value};

use refill_core::error::AppError;
use refill_core::result::AppResult;

use crate::transport::HttpResponse;

/// Decode a successful response body.
///
/// Bodies without a JSON content type, empty bodies and `204` all decode
/// to an empty object.
pub fn decode_body(response: &HttpResponse) -> AppResult<Value> {
    let is_json = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));

    if response.status == 204 || !is_json || response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    Ok(serde_json::from_slice(&response.body)?)
}

/// Message and error code the backend attached to a failed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetails {
    /// Human-readable message.
    pub message: String,
    /// Machine-readable code, e.g. `USER_NOT_FOUND`.
    pub code: Option<String>,
}

/// Extract the error message and code from a failed response.
///
/// The message is read from `detail.message`, `message` then `error`; the
/// code from `detail.error_code` then `error_code`.
pub fn error_details(response: &HttpResponse) -> ErrorDetails {
    let body: Value = serde_json::from_slice(&response.body).unwrap_or(Value::Null);
    let detail = body.get("detail");

    let message = [
        detail.and_then(|d| d.get("message")),
        body.get("message"),
        body.get("error"),
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_str)
    .map(str::to_string)
    .unwrap_or_else(|| {
        let reason = reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        format!("API request failed: {reason} (Status: {})", response.status)
    });

    let code = [
        detail.and_then(|d| d.get("error_code")),
        body.get("error_code"),
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_str)
    .map(str::to_string);

    ErrorDetails { message, code }
}

/// Map a failed response to an [`AppError`].
pub fn api_error(response: &HttpResponse) -> AppError {
    let details = error_details(response);
    let err = if response.status == 401 {
        AppError::unauthorized(details.message)
    } else {
        AppError::api(response.status, details.message)
    };
    err.with_code(details.code)
}
