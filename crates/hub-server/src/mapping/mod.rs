//! WireMock stub mapping documents.
//!
//! A mapping is the unit of configuration WireMock understands: a request
//! matcher plus a response definition, with optional scenario and priority
//! metadata. WireMock's admin schema keeps growing, so only the fields this
//! hub actually reasons about are typed; everything else passes through
//! opaquely via flattened `extra` maps and survives a round trip unchanged.

pub mod metadata;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A WireMock stub mapping (request matcher + response definition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    /// Remote identifier assigned by a WireMock server. Absent until the
    /// first create-sync succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Alternate remote identifier; some WireMock versions use `uuid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub request: MappingRequest,
    pub response: MappingResponse,
    /// Lower number wins when several stubs match the same request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_scenario_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
    /// Free-form metadata map. The sync path injects hub provenance keys
    /// here on the outbound copy only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request matcher side of a mapping.
///
/// At most one of the four URL fields is expected to be set. Header, query
/// and cookie matchers are kept as raw JSON values: each entry is either a
/// bare string or a predicate object (`{"equalTo": ...}`, `{"matches": ...}`,
/// ...), and the hub only ever interprets the `equalTo` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Exact full URL (path + query).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Exact path, any query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    /// Regex over the full URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    /// Regex over the path only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Map<String, Value>>,
    /// Ordered body matchers (`equalTo`, `equalToJson`, `contains`,
    /// `matches`, ...). Kept as raw objects so unknown kinds pass through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_patterns: Option<Vec<Map<String, Value>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response definition side of a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Structured JSON body; takes precedence over `body` when both exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_delay_milliseconds: Option<u64>,
    /// WireMock response transformers, e.g. `response-template`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformers: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mapping {
    /// The remote identifier under which a WireMock server knows this
    /// mapping, if it has ever been create-synced.
    pub fn remote_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.uuid.as_deref())
    }

    /// Expected response body as a string: literal `body` wins, otherwise
    /// a serialized `jsonBody`.
    pub fn expected_body(&self) -> Option<String> {
        if let Some(body) = &self.response.body {
            return Some(body.clone());
        }
        self.response.json_body.as_ref().map(|j| j.to_string())
    }
}

/// Extract the concrete values of `{"equalTo": "..."}`-shaped matchers.
///
/// Bare strings, regex predicates and every other matcher kind cannot be
/// inverted into a single concrete value and are skipped, not errored.
pub fn equal_to_values(matchers: Option<&Map<String, Value>>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    if let Some(map) = matchers {
        for (key, value) in map {
            if let Some(equal_to) = value.get("equalTo").and_then(Value::as_str) {
                out.insert(key.clone(), equal_to.to_string());
            }
        }
    }
    out
}
