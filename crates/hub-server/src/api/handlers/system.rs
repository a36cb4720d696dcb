//! System endpoints.

use crate::api::types::ok_data;
use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde_json::json;

/// GET /health
pub fn handle_health() -> Response<Full<Bytes>> {
    ok_data(&json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
