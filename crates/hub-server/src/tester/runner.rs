//! Fire a built test request at every active instance of a project.
//!
//! Each instance is called as an independent concurrent task whose failure
//! resolves to a failed-result row, never an error that could cancel
//! siblings. The verdict per instance is status equality only; bodies and
//! headers are reported for comparison but do not affect pass/fail.

use super::builder::{build_test_request, BuildRequestError, TestOverrides, TestRequest};
use crate::config::WireMockConfig;
use crate::store::{HubStore, StoreError, WiremockInstance};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StubTestError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Build(#[from] BuildRequestError),
    #[error("No active WireMock instances found in this project")]
    NoActiveInstances,
}

/// Outcome of one test call against one instance.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTestResult {
    pub instance_id: Uuid,
    pub instance_name: String,
    pub instance_url: String,
    /// Whether the HTTP call completed at all (any status counts).
    pub success: bool,
    /// Whether the actual status equals the mapping's expected status.
    pub matched: bool,
    pub expected_status: u16,
    pub actual_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Aggregate result for one stub-test run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StubTestReport {
    pub stub_id: Uuid,
    pub stub_name: String,
    /// The resolved request actually sent.
    pub request: TestRequest,
    pub results: Vec<InstanceTestResult>,
    pub summary: TestSummary,
}

pub struct StubTester {
    store: Arc<HubStore>,
    http: reqwest::Client,
    timeout: Duration,
}

struct Expected {
    status: u16,
    body: Option<String>,
    headers: Option<HashMap<String, String>>,
}

impl StubTester {
    pub fn new(store: Arc<HubStore>, config: &WireMockConfig) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
            timeout: Duration::from_secs(config.admin_timeout_secs),
        }
    }

    /// Build the request from the stub's mapping and run it against every
    /// active instance of the stub's project, concurrently.
    pub async fn test_stub(
        &self,
        stub_id: Uuid,
        overrides: &TestOverrides,
    ) -> Result<StubTestReport, StubTestError> {
        let stub = self.store.get_stub(stub_id)?;
        let request = build_test_request(&stub.mapping, overrides)?;

        let instances = self.store.active_instances(stub.project_id)?;
        if instances.is_empty() {
            return Err(StubTestError::NoActiveInstances);
        }

        let expected = Expected {
            status: stub.mapping.response.status,
            body: stub.mapping.expected_body(),
            headers: stub.mapping.response.headers.clone(),
        };

        let calls = instances
            .iter()
            .map(|instance| self.call_instance(instance, &request, &expected));
        let results = join_all(calls).await;

        let passed = results.iter().filter(|r| r.matched).count();
        Ok(StubTestReport {
            stub_id: stub.id,
            stub_name: stub.name.clone().unwrap_or_default(),
            summary: TestSummary {
                total: results.len(),
                passed,
                failed: results.len() - passed,
            },
            request,
            results,
        })
    }

    async fn call_instance(
        &self,
        instance: &WiremockInstance,
        request: &TestRequest,
        expected: &Expected,
    ) -> InstanceTestResult {
        let started = Instant::now();
        let url = request_url(&instance.url, request);
        debug!("Testing {} {} against {}", request.method, url, instance.name);

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);
        let mut outbound = self.http.request(method, &url).timeout(self.timeout);
        for (name, value) in &request.headers {
            outbound = outbound.header(name, value);
        }
        if let Some(body) = &request.body {
            outbound = outbound.body(body.clone());
        }

        let mut result = InstanceTestResult {
            instance_id: instance.id,
            instance_name: instance.name.clone(),
            instance_url: instance.url.clone(),
            success: false,
            matched: false,
            expected_status: expected.status,
            actual_status: 0,
            expected_body: expected.body.clone(),
            actual_body: None,
            expected_headers: expected.headers.clone(),
            actual_headers: None,
            error: None,
            response_time_ms: 0,
        };

        // Any HTTP status is a valid answer; only transport failures are
        // exceptional, and those become a failed row, not an error.
        match outbound.send().await {
            Ok(response) => {
                result.actual_status = response.status().as_u16();
                result.actual_headers = Some(
                    response
                        .headers()
                        .iter()
                        .filter_map(|(k, v)| {
                            v.to_str().ok().map(|v| (k.to_string(), v.to_string()))
                        })
                        .collect(),
                );
                match response.text().await {
                    Ok(text) => {
                        result.success = true;
                        result.matched = result.actual_status == expected.status;
                        result.actual_body = Some(text);
                    }
                    Err(e) => {
                        result.error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                result.error = Some(e.to_string());
            }
        }

        result.response_time_ms = started.elapsed().as_millis() as u64;
        result
    }
}

/// Instance base URL + built path + encoded query string.
fn request_url(base: &str, request: &TestRequest) -> String {
    let mut url = format!("{}{}", base.trim_end_matches('/'), request.url);
    if !request.query_parameters.is_empty() {
        let encoded: Vec<String> = request
            .query_parameters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        url.push('?');
        url.push_str(&encoded.join("&"));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, query: &[(&str, &str)]) -> TestRequest {
        TestRequest {
            method: "GET".into(),
            url: url.into(),
            headers: HashMap::new(),
            query_parameters: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
        }
    }

    #[test]
    fn test_request_url_joins_and_encodes() {
        let url = request_url(
            "http://localhost:8080/",
            &request("/search", &[("q", "a b")]),
        );
        assert_eq!(url, "http://localhost:8080/search?q=a%20b");
    }

    #[test]
    fn test_request_url_without_query() {
        let url = request_url("http://localhost:8080", &request("/ping", &[]));
        assert_eq!(url, "http://localhost:8080/ping");
    }
}
