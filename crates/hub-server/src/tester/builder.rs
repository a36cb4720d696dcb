//! Derive a concrete, executable HTTP request from a mapping's abstract
//! request matcher.
//!
//! Pattern matchers are one-directional: a regex matches many URLs but
//! cannot be inverted into "the" URL, so a pattern-only mapping needs an
//! explicit URL override before it can be executed.

use crate::mapping::{equal_to_values, Mapping};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildRequestError {
    #[error("URL override is required for pattern-based URL matching (urlPattern/urlPathPattern)")]
    UrlOverrideRequired,
    #[error("No URL could be determined from the stub mapping")]
    NoUrl,
}

/// Caller-supplied overrides, all optional. A supplied body replaces the
/// mapping-derived one outright (an empty string clears it).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOverrides {
    pub url: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<String>,
    pub query_parameters: Option<HashMap<String, String>>,
}

/// A fully resolved request, ready to send.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub query_parameters: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Build a concrete request from `mapping`, layered with `overrides`.
///
/// Deterministic and side-effect free. URL precedence: explicit override,
/// then exact `url`, then exact `urlPath`; a pattern-only mapping without
/// an override fails. Only `{"equalTo": ...}` header/query matchers
/// translate into concrete values; other kinds are skipped. The body comes
/// from the first body pattern, preferring `equalToJson` (serialized if
/// structured) over `equalTo`.
pub fn build_test_request(
    mapping: &Mapping,
    overrides: &TestOverrides,
) -> Result<TestRequest, BuildRequestError> {
    let request = &mapping.request;
    let method = request
        .method
        .clone()
        .unwrap_or_else(|| "GET".to_string())
        .to_uppercase();

    let mut requires_override = false;
    let mut url: Option<String> = None;
    if let Some(exact) = &request.url {
        url = Some(exact.clone());
    } else if let Some(path) = &request.url_path {
        url = Some(path.clone());
    } else if request.url_pattern.is_some() || request.url_path_pattern.is_some() {
        requires_override = true;
    }

    if let Some(override_url) = &overrides.url {
        url = Some(override_url.clone());
    }

    let url = match url {
        Some(u) => u,
        None if requires_override => return Err(BuildRequestError::UrlOverrideRequired),
        None => return Err(BuildRequestError::NoUrl),
    };

    let mut headers = equal_to_values(request.headers.as_ref());
    if let Some(override_headers) = &overrides.headers {
        headers.extend(override_headers.clone());
    }

    let mut query_parameters = equal_to_values(request.query_parameters.as_ref());
    if let Some(override_query) = &overrides.query_parameters {
        query_parameters.extend(override_query.clone());
    }

    let mut body = body_from_patterns(mapping);
    if let Some(override_body) = &overrides.body {
        body = Some(override_body.clone());
    }

    Ok(TestRequest {
        method,
        url,
        headers,
        query_parameters,
        body,
    })
}

fn body_from_patterns(mapping: &Mapping) -> Option<String> {
    let first = mapping.request.body_patterns.as_ref()?.first()?;
    if let Some(json) = first.get("equalToJson") {
        return Some(match json {
            Value::String(s) => s.clone(),
            structured => structured.to_string(),
        });
    }
    if let Some(Value::String(s)) = first.get("equalTo") {
        return Some(s.clone());
    }
    None
}
