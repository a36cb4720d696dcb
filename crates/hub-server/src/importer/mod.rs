//! Replay a logged request as a new stub.
//!
//! Takes one entry of a remote instance's request journal and synthesizes a
//! mapping from it, with a caller-configured matching strategy (exact URL
//! vs. pattern, header subset, body comparison mode). The resulting stub is
//! stored locally only; it is never auto-synced back to any instance.

use crate::mapping::Mapping;
use crate::store::{HubStore, StoreError, Stub};
use crate::wiremock::{LoggedRequest, WireMockClient, WireMockError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The journal entry does not exist on the remote instance.
    #[error("Request not found")]
    RequestNotFound,
    #[error("Failed to fetch request from WireMock: {0}")]
    WireMock(#[source] WireMockError),
    /// The synthesized document did not form a valid mapping.
    #[error("Failed to build mapping from request: {0}")]
    InvalidMapping(String),
}

/// Which URL field of the mapping the literal pattern text goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlMatchType {
    Url,
    UrlPath,
    UrlPattern,
    UrlPathPattern,
}

impl UrlMatchType {
    fn field_name(self) -> &'static str {
        match self {
            UrlMatchType::Url => "url",
            UrlMatchType::UrlPath => "urlPath",
            UrlMatchType::UrlPattern => "urlPattern",
            UrlMatchType::UrlPathPattern => "urlPathPattern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyMatchType {
    EqualTo,
    EqualToJson,
    Contains,
    Matches,
}

impl BodyMatchType {
    fn field_name(self) -> &'static str {
        match self {
            BodyMatchType::EqualTo => "equalTo",
            BodyMatchType::EqualToJson => "equalToJson",
            BodyMatchType::Contains => "contains",
            BodyMatchType::Matches => "matches",
        }
    }
}

/// Flags for `equalToJson` body matching.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMatchOptions {
    #[serde(default)]
    pub ignore_array_order: bool,
    #[serde(default)]
    pub ignore_extra_elements: bool,
}

/// How the caller wants the logged request turned into a mapping.
///
/// The caller (the UI) pre-fills `url_pattern` from the observed URL; the
/// importer stores the literal text and never infers a pattern itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSpec {
    pub project_id: Uuid,
    pub name: String,
    pub url_match_type: UrlMatchType,
    pub url_pattern: String,
    #[serde(default)]
    pub match_headers: Vec<String>,
    #[serde(default)]
    pub body_match_type: Option<BodyMatchType>,
    #[serde(default)]
    pub body_match_options: BodyMatchOptions,
    #[serde(default)]
    pub response_headers: Vec<String>,
    #[serde(default)]
    pub enable_templating: bool,
}

/// Deterministically derive a mapping from a logged request.
pub fn generate_mapping(logged: &LoggedRequest, spec: &ImportSpec) -> Result<Mapping, String> {
    let mut request = Map::new();
    request.insert("method".into(), json!(logged.request.method));
    request.insert(
        spec.url_match_type.field_name().into(),
        json!(spec.url_pattern),
    );

    // Header subset: only headers the original request actually carried
    // become equality matchers; the rest are silently omitted.
    let mut header_matchers = Map::new();
    for name in &spec.match_headers {
        if let Some(value) = logged.request.header(name) {
            header_matchers.insert(name.clone(), json!({ "equalTo": value }));
        }
    }
    if !header_matchers.is_empty() {
        request.insert("headers".into(), Value::Object(header_matchers));
    }

    if let (Some(body_match), Some(body)) = (spec.body_match_type, logged.request.body.as_deref()) {
        let mut pattern = Map::new();
        match body_match {
            BodyMatchType::EqualToJson => match serde_json::from_str::<Value>(body) {
                Ok(parsed) => {
                    pattern.insert("equalToJson".into(), parsed);
                    if spec.body_match_options.ignore_array_order {
                        pattern.insert("ignoreArrayOrder".into(), json!(true));
                    }
                    if spec.body_match_options.ignore_extra_elements {
                        pattern.insert("ignoreExtraElements".into(), json!(true));
                    }
                }
                // Not valid JSON after all: degrade to a literal match.
                Err(_) => {
                    pattern.insert("equalTo".into(), json!(body));
                }
            },
            other => {
                pattern.insert(other.field_name().into(), json!(body));
            }
        }
        request.insert("bodyPatterns".into(), json!([pattern]));
    }

    // The actual response is preferred over the stub-defined one, falling
    // back field by field: a journal entry may record the served status but
    // only carry headers or a body on the response definition.
    let actual = logged.response.as_ref();
    let defined = logged.response_definition.as_ref();
    let status = actual
        .map(|r| r.status)
        .or_else(|| defined.map(|r| r.status))
        .unwrap_or(200);

    let mut response = Map::new();
    response.insert("status".into(), json!(status));

    let header_source = actual
        .filter(|r| r.headers.is_some())
        .or_else(|| defined.filter(|r| r.headers.is_some()));
    if let Some(source) = header_source {
        let mut response_headers = Map::new();
        for name in &spec.response_headers {
            if let Some(value) = source.header(name) {
                response_headers.insert(name.clone(), json!(value));
            }
        }
        if !response_headers.is_empty() {
            response.insert("headers".into(), Value::Object(response_headers));
        }
    }

    let body_source = actual
        .and_then(|r| r.body.as_deref())
        .or_else(|| defined.and_then(|r| r.body.as_deref()));
    if let Some(body) = body_source {
        match serde_json::from_str::<Value>(body) {
            Ok(parsed) => response.insert("jsonBody".into(), parsed),
            Err(_) => response.insert("body".into(), json!(body)),
        };
    }

    if spec.enable_templating {
        response.insert("transformers".into(), json!(["response-template"]));
    }

    let document = json!({
        "name": spec.name,
        "request": Value::Object(request),
        "response": Value::Object(response)
    });
    serde_json::from_value(document).map_err(|e| e.to_string())
}

pub struct RequestImporter {
    store: Arc<HubStore>,
    client: WireMockClient,
}

impl RequestImporter {
    pub fn new(store: Arc<HubStore>, client: WireMockClient) -> Self {
        Self { store, client }
    }

    /// Fetch a journal entry from the instance and persist it as a new stub
    /// in the target project.
    pub async fn import_request(
        &self,
        instance_id: Uuid,
        request_id: &str,
        spec: ImportSpec,
    ) -> Result<Stub, ImportError> {
        let instance = self.store.get_instance(instance_id)?;
        self.store.get_project(spec.project_id)?;

        let logged = self
            .client
            .get_request(&instance.url, request_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ImportError::RequestNotFound
                } else {
                    ImportError::WireMock(e)
                }
            })?;

        let mapping = generate_mapping(&logged, &spec).map_err(ImportError::InvalidMapping)?;
        let stub = self.store.create_stub(Stub::new(
            spec.project_id,
            Some(spec.name.clone()),
            None,
            mapping,
        ))?;
        info!(
            "Imported request {} from {} as stub {}",
            request_id, instance.url, stub.id
        );
        Ok(stub)
    }
}
