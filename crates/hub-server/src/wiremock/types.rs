//! Wire types for the WireMock request journal.

use crate::mapping::Mapping;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One entry of a WireMock instance's request journal.
///
/// Never persisted locally; fetched live from the remote instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedRequest {
    #[serde(default)]
    pub id: String,
    pub request: RequestDetails,
    /// The response actually served, when the journal recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseDetails>,
    /// The response definition of the matched stub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_definition: Option<ResponseDetails>,
    #[serde(default)]
    pub was_matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stub_mapping: Option<Mapping>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw request half of a journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_url: Option<String>,
    pub method: String,
    /// Header values arrive as strings or string arrays; kept raw.
    #[serde(default)]
    pub headers: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_date_string: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestDetails {
    /// Header value as a string, tolerating WireMock's occasional
    /// single-element array form.
    pub fn header(&self, name: &str) -> Option<&str> {
        match self.headers.get(name)? {
            Value::String(s) => Some(s),
            Value::Array(items) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Response half of a journal entry (actual or stub-defined).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetails {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseDetails {
    pub fn header(&self, name: &str) -> Option<&str> {
        match self.headers.as_ref()?.get(name)? {
            Value::String(s) => Some(s),
            Value::Array(items) => items.first().and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Normalize the `/__admin/requests/unmatched` payload into the same shape
/// as `/__admin/requests`.
///
/// WireMock returns unmatched entries as flat request objects without the
/// `request` wrapper and usually without an id. Each entry is re-wrapped,
/// given a synthesized id when the server supplied none, and marked
/// `wasMatched: false`.
pub fn normalize_unmatched(raw: &Value) -> Value {
    let requests: Vec<Value> = raw
        .get("requests")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    let id = entry
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| {
                            let logged_date = entry
                                .get("loggedDate")
                                .and_then(Value::as_i64)
                                .unwrap_or_default();
                            format!("unmatched-{index}-{logged_date}")
                        });
                    json!({
                        "id": id,
                        "request": entry,
                        "wasMatched": false
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "requests": requests,
        "requestJournalDisabled": raw
            .get("requestJournalDisabled")
            .cloned()
            .unwrap_or(Value::Bool(false))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_unmatched_wraps_flat_entries() {
        let raw = json!({
            "requests": [
                {
                    "url": "/missing",
                    "method": "GET",
                    "loggedDate": 1700000000123i64
                }
            ],
            "requestJournalDisabled": false
        });

        let normalized = normalize_unmatched(&raw);
        let entry = &normalized["requests"][0];
        assert_eq!(entry["id"], "unmatched-0-1700000000123");
        assert_eq!(entry["wasMatched"], false);
        assert_eq!(entry["request"]["url"], "/missing");
        assert_eq!(normalized["requestJournalDisabled"], false);
    }

    #[test]
    fn test_normalize_unmatched_keeps_server_id() {
        let raw = json!({
            "requests": [{"id": "abc", "url": "/x", "method": "POST"}]
        });
        let normalized = normalize_unmatched(&raw);
        assert_eq!(normalized["requests"][0]["id"], "abc");
    }

    #[test]
    fn test_normalize_unmatched_tolerates_missing_requests() {
        let normalized = normalize_unmatched(&json!({}));
        assert_eq!(normalized["requests"], json!([]));
    }

    #[test]
    fn test_logged_request_parses_journal_entry() {
        let entry: LoggedRequest = serde_json::from_value(json!({
            "id": "req-1",
            "request": {
                "url": "/api/orders?limit=1",
                "absoluteUrl": "http://localhost:8080/api/orders?limit=1",
                "method": "POST",
                "headers": {"Content-Type": "application/json", "Accept": ["text/plain"]},
                "body": "{\"sku\":1}",
                "loggedDate": 1700000000000i64
            },
            "responseDefinition": {"status": 201, "body": "ok"},
            "wasMatched": true
        }))
        .unwrap();

        assert_eq!(entry.request.header("Content-Type"), Some("application/json"));
        assert_eq!(entry.request.header("Accept"), Some("text/plain"));
        assert_eq!(entry.request.header("Missing"), None);
        assert_eq!(entry.response_definition.unwrap().status, 201);
        assert!(entry.was_matched);
    }
}
