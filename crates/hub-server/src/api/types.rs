//! Response envelope and request-parsing helpers for the hub API.
//!
//! Every endpoint answers with a `{success, data | error}` JSON envelope.
//! Batch operations report per-item failures as data inside a success
//! envelope; only precondition failures produce a non-success status.

use crate::store::StoreError;
use crate::wiremock::WireMockError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

/// Create a JSON response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// 200 with a `{success: true, data}` envelope.
pub fn ok_data<T: Serialize>(data: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &json!({ "success": true, "data": data }))
}

/// 201 with a `{success: true, data}` envelope.
pub fn created_data<T: Serialize>(data: &T) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::CREATED,
        &json!({ "success": true, "data": data }),
    )
}

/// 200 with a `{success: true, message}` envelope.
pub fn ok_message(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &json!({ "success": true, "message": message }),
    )
}

/// Non-success envelope with a human-readable reason.
pub fn error_response(status: StatusCode, error: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "success": false, "error": error }))
}

/// Non-success envelope carrying the underlying failure as `details`.
pub fn error_with_details(
    status: StatusCode,
    error: &str,
    details: &str,
) -> Response<Full<Bytes>> {
    json_response(
        status,
        &json!({ "success": false, "error": error, "details": details }),
    )
}

pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Map a local lookup failure to its envelope (always a 404 unless the
/// snapshot write itself failed).
pub fn store_error_response(e: &StoreError) -> Response<Full<Bytes>> {
    match e {
        StoreError::Persist(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
        _ => error_response(StatusCode::NOT_FOUND, &e.to_string()),
    }
}

/// Map a remote admin-API failure to a 502 envelope, keeping the transport
/// message as details for diagnostics.
pub fn wiremock_error_response(error: &str, e: &WireMockError) -> Response<Full<Bytes>> {
    error_with_details(StatusCode::BAD_GATEWAY, error, &e.to_string())
}

/// Collect and deserialize a JSON request body. An empty body
/// deserializes as `T::default()` so POSTs without payload still work for
/// all-optional schemas.
pub async fn parse_json_body<T>(req: Request<Incoming>) -> Result<T, Response<Full<Bytes>>>
where
    T: DeserializeOwned + Default,
{
    use http_body_util::BodyExt;
    let bytes = req
        .collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| {
            error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            )
        })?;
    if bytes.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|e| {
        error_with_details(StatusCode::BAD_REQUEST, "Validation error", &e.to_string())
    })
}

/// Extract one query-string parameter, percent-decoded.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some(name) {
            let raw = parts.next().unwrap_or_default();
            return Some(
                urlencoding::decode(raw)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| raw.to_string()),
            );
        }
    }
    None
}
