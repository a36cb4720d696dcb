//! End-to-end tests of the sync engine, stub tester and request importer
//! against an in-process WireMock admin-API double.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hub_server::config::WireMockConfig;
use hub_server::importer::{ImportSpec, RequestImporter, UrlMatchType};
use hub_server::store::{HubStore, Stub, StubUpdate, WiremockInstance};
use hub_server::sync::{SyncEngine, SyncError};
use hub_server::tester::{StubTester, TestOverrides};
use hub_server::wiremock::WireMockClient;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct RecordedCall {
    method: String,
    path: String,
    body: Value,
}

#[derive(Default)]
struct FakeState {
    calls: Mutex<Vec<RecordedCall>>,
    /// Answer `POST /__admin/mappings/reset` with a 500.
    fail_reset: AtomicBool,
    /// Mapping names whose create should fail with a 500.
    fail_create_named: Mutex<Vec<String>>,
    /// Remote ids whose PUT should answer 404.
    missing_put_ids: Mutex<Vec<String>>,
    /// Journal entries served under `/__admin/requests/:id`.
    journal: Mutex<HashMap<String, Value>>,
    next_id: AtomicUsize,
}

impl FakeState {
    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn calls_matching(&self, method: &str, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }
}

/// Minimal WireMock admin-API double. Records every call and answers the
/// endpoints the hub talks to; anything outside `/__admin` plays the role
/// of the mock server's own traffic port.
struct FakeWireMock {
    url: String,
    state: Arc<FakeState>,
}

impl FakeWireMock {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(FakeState::default());

        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let io = TokioIo::new(stream);
                let state = Arc::clone(&server_state);
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, hyper::Error>(handle(req, state).await) }
                    });
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }
}

async fn handle(req: Request<Incoming>, state: Arc<FakeState>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let bytes = req
        .into_body()
        .collect()
        .await
        .map(|b| b.to_bytes())
        .unwrap_or_default();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    state.calls.lock().push(RecordedCall {
        method: method.to_string(),
        path: path.clone(),
        body: body.clone(),
    });

    let respond = |status: StatusCode, value: Value| {
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(value.to_string())))
            .unwrap()
    };

    if path == "/__admin/mappings/reset" && method == Method::POST {
        if state.fail_reset.load(Ordering::SeqCst) {
            return respond(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"}));
        }
        return respond(StatusCode::OK, json!({}));
    }

    if path == "/__admin/mappings" {
        return match method {
            Method::GET => respond(StatusCode::OK, json!({"mappings": [], "meta": {"total": 0}})),
            Method::DELETE => respond(StatusCode::OK, json!({})),
            Method::POST => {
                let name = body.get("name").and_then(Value::as_str).unwrap_or_default();
                if state.fail_create_named.lock().iter().any(|n| n == name) {
                    return respond(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({"error": "create rejected"}),
                    );
                }
                let mut stored = body.clone();
                let n = state.next_id.fetch_add(1, Ordering::SeqCst);
                if let Some(object) = stored.as_object_mut() {
                    object.insert("id".into(), json!(format!("fake-{n}")));
                }
                respond(StatusCode::CREATED, stored)
            }
            _ => respond(StatusCode::NOT_FOUND, json!({})),
        };
    }

    if let Some(id) = path.strip_prefix("/__admin/mappings/") {
        if method == Method::PUT {
            if state.missing_put_ids.lock().iter().any(|m| m == id) {
                return respond(StatusCode::NOT_FOUND, json!({"error": "no such mapping"}));
            }
            return respond(StatusCode::OK, body);
        }
    }

    if let Some(id) = path.strip_prefix("/__admin/requests/") {
        if method == Method::GET {
            return match state.journal.lock().get(id) {
                Some(entry) => respond(StatusCode::OK, entry.clone()),
                None => respond(StatusCode::NOT_FOUND, json!({"error": "not found"})),
            };
        }
    }

    // Everything else is the mock server's traffic port.
    respond(StatusCode::OK, json!({"ok": true}))
}

fn config() -> WireMockConfig {
    WireMockConfig {
        admin_timeout_secs: 5,
        health_timeout_secs: 2,
    }
}

fn mapping(name: &str, status: u16) -> hub_server::mapping::Mapping {
    serde_json::from_value(json!({
        "name": name,
        "request": {"method": "GET", "urlPath": format!("/{name}")},
        "response": {"status": status, "jsonBody": {"ok": true}}
    }))
    .unwrap()
}

struct Fixture {
    store: Arc<HubStore>,
    project_id: Uuid,
    instance_id: Uuid,
}

fn fixture(instance_url: &str) -> Fixture {
    let store = Arc::new(HubStore::in_memory());
    let project = store
        .create_project(hub_server::store::Project::new("checkout".into(), None))
        .unwrap();
    let instance = store
        .create_instance(WiremockInstance::new(
            project.id,
            "primary".into(),
            instance_url.to_string(),
        ))
        .unwrap();
    Fixture {
        store,
        project_id: project.id,
        instance_id: instance.id,
    }
}

fn add_stub(fx: &Fixture, name: &str) -> Stub {
    fx.store
        .create_stub(Stub::new(
            fx.project_id,
            Some(name.to_string()),
            None,
            mapping(name, 200),
        ))
        .unwrap()
}

#[tokio::test]
async fn sync_all_pushes_active_stubs_with_metadata() {
    let fake = FakeWireMock::start().await;
    let fx = fixture(&fake.url);
    add_stub(&fx, "alpha");
    add_stub(&fx, "beta");
    let inactive = add_stub(&fx, "dormant");
    fx.store
        .update_stub(
            inactive.id,
            StubUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let engine = SyncEngine::new(Arc::clone(&fx.store), WireMockClient::new(&config()));
    let report = engine
        .sync_all(fx.project_id, fx.instance_id, true)
        .await
        .unwrap();

    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 0);
    assert!(report.errors.is_empty());

    assert_eq!(fake.state.calls_matching("POST", "/__admin/mappings/reset").len(), 1);
    let creates = fake.state.calls_matching("POST", "/__admin/mappings");
    assert_eq!(creates.len(), 2);
    let pushed: Vec<&str> = creates
        .iter()
        .map(|c| c.body["name"].as_str().unwrap())
        .collect();
    assert!(pushed.contains(&"alpha"));
    assert!(pushed.contains(&"beta"));
    assert!(!pushed.contains(&"dormant"));

    // Provenance stamped on the wire, not in the local record.
    for call in &creates {
        assert_eq!(
            call.body["metadata"]["hub_project_id"],
            json!(fx.project_id.to_string())
        );
        assert_eq!(call.body["metadata"]["hub_project_name"], json!("checkout"));
    }
    for stub in fx.store.list_stubs(fx.project_id).unwrap() {
        assert!(stub.mapping.metadata.is_none());
    }
}

#[tokio::test]
async fn sync_all_isolates_per_stub_failures() {
    let fake = FakeWireMock::start().await;
    fake.state.fail_create_named.lock().push("bad".into());
    let fx = fixture(&fake.url);
    add_stub(&fx, "good-1");
    add_stub(&fx, "bad");
    add_stub(&fx, "good-2");

    let engine = SyncEngine::new(Arc::clone(&fx.store), WireMockClient::new(&config()));
    let report = engine
        .sync_all(fx.project_id, fx.instance_id, false)
        .await
        .unwrap();

    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("500"));
}

#[tokio::test]
async fn sync_all_aborts_when_reset_fails() {
    let fake = FakeWireMock::start().await;
    fake.state.fail_reset.store(true, Ordering::SeqCst);
    let fx = fixture(&fake.url);
    add_stub(&fx, "alpha");

    let engine = SyncEngine::new(Arc::clone(&fx.store), WireMockClient::new(&config()));
    let err = engine
        .sync_all(fx.project_id, fx.instance_id, true)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Reset(_)));
    // The reset precondition failed, so nothing may have been pushed.
    assert!(fake.state.calls_matching("POST", "/__admin/mappings").is_empty());
}

#[tokio::test]
async fn sync_stub_records_remote_id_then_updates() {
    let fake = FakeWireMock::start().await;
    let fx = fixture(&fake.url);
    let stub = add_stub(&fx, "alpha");

    let engine = SyncEngine::new(Arc::clone(&fx.store), WireMockClient::new(&config()));

    // First sync creates and persists the server-assigned id.
    engine.sync_stub(stub.id, fx.instance_id).await.unwrap();
    let synced = fx.store.get_stub(stub.id).unwrap();
    let remote_id = synced.mapping.id.clone().unwrap();
    assert!(remote_id.starts_with("fake-"));

    // Second sync goes through PUT with that id.
    engine.sync_stub(stub.id, fx.instance_id).await.unwrap();
    let puts = fake
        .state
        .calls_matching("PUT", &format!("/__admin/mappings/{remote_id}"));
    assert_eq!(puts.len(), 1);
    assert_eq!(fake.state.calls_matching("POST", "/__admin/mappings").len(), 1);
}

#[tokio::test]
async fn sync_stub_recreates_after_remote_wipe() {
    let fake = FakeWireMock::start().await;
    fake.state.missing_put_ids.lock().push("fake-0".into());
    // "fake-0" is claimed out of band below, so move the double's id
    // counter past it: a fresh create must yield a distinct id.
    fake.state.next_id.store(1, Ordering::SeqCst);
    let fx = fixture(&fake.url);
    let stub = add_stub(&fx, "alpha");
    fx.store.set_stub_remote_id(stub.id, "fake-0").unwrap();

    let engine = SyncEngine::new(Arc::clone(&fx.store), WireMockClient::new(&config()));
    engine.sync_stub(stub.id, fx.instance_id).await.unwrap();

    // PUT answered 404, so the stub was re-created and the fresh id stored.
    assert_eq!(
        fake.state
            .calls_matching("PUT", "/__admin/mappings/fake-0")
            .len(),
        1
    );
    assert_eq!(fake.state.calls_matching("POST", "/__admin/mappings").len(), 1);
    let synced = fx.store.get_stub(stub.id).unwrap();
    assert_ne!(synced.mapping.id.as_deref(), Some("fake-0"));
}

#[tokio::test]
async fn sync_stub_rejects_foreign_instance() {
    let fake = FakeWireMock::start().await;
    let fx = fixture(&fake.url);
    let stub = add_stub(&fx, "alpha");

    let other_project = fx
        .store
        .create_project(hub_server::store::Project::new("other".into(), None))
        .unwrap();
    let foreign = fx
        .store
        .create_instance(WiremockInstance::new(
            other_project.id,
            "foreign".into(),
            fake.url.clone(),
        ))
        .unwrap();

    let engine = SyncEngine::new(Arc::clone(&fx.store), WireMockClient::new(&config()));
    let err = engine.sync_stub(stub.id, foreign.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));
    assert!(fake.state.calls().is_empty());
}

#[tokio::test]
async fn test_stub_reports_per_instance_outcomes() {
    let fake = FakeWireMock::start().await;
    let fx = fixture(&fake.url);
    let stub = add_stub(&fx, "alpha");

    // A second instance nobody listens on: its failure must not disturb
    // the healthy instance's result.
    fx.store
        .create_instance(WiremockInstance::new(
            fx.project_id,
            "dead".into(),
            "http://127.0.0.1:1".into(),
        ))
        .unwrap();

    let tester = StubTester::new(Arc::clone(&fx.store), &config());
    let report = tester
        .test_stub(stub.id, &TestOverrides::default())
        .await
        .unwrap();

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.request.method, "GET");
    assert_eq!(report.request.url, "/alpha");

    let ok = report
        .results
        .iter()
        .find(|r| r.instance_name == "primary")
        .unwrap();
    assert!(ok.success);
    assert!(ok.matched);
    assert_eq!(ok.actual_status, 200);

    let dead = report
        .results
        .iter()
        .find(|r| r.instance_name == "dead")
        .unwrap();
    assert!(!dead.success);
    assert!(!dead.matched);
    assert!(dead.error.is_some());
}

#[tokio::test]
async fn test_stub_status_mismatch_fails_the_verdict() {
    let fake = FakeWireMock::start().await;
    let fx = fixture(&fake.url);
    // The double answers every traffic-port request with 200.
    let stub = fx
        .store
        .create_stub(Stub::new(
            fx.project_id,
            Some("gone".into()),
            None,
            mapping("gone", 404),
        ))
        .unwrap();

    let tester = StubTester::new(Arc::clone(&fx.store), &config());
    let report = tester
        .test_stub(stub.id, &TestOverrides::default())
        .await
        .unwrap();

    assert_eq!(report.summary.passed, 0);
    assert_eq!(report.summary.failed, 1);
    let result = &report.results[0];
    // The call completed, so it is a success row, just not a match.
    assert!(result.success);
    assert!(!result.matched);
    assert_eq!(result.expected_status, 404);
    assert_eq!(result.actual_status, 200);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_stub_body_difference_does_not_affect_verdict() {
    let fake = FakeWireMock::start().await;
    let fx = fixture(&fake.url);
    let stub = fx
        .store
        .create_stub(Stub::new(
            fx.project_id,
            Some("textual".into()),
            None,
            serde_json::from_value(json!({
                "request": {"method": "GET", "urlPath": "/textual"},
                "response": {"status": 200, "body": "expected text"}
            }))
            .unwrap(),
        ))
        .unwrap();

    let tester = StubTester::new(Arc::clone(&fx.store), &config());
    let report = tester
        .test_stub(stub.id, &TestOverrides::default())
        .await
        .unwrap();

    // Status equality is the sole criterion; bodies are reported for
    // comparison but never flip the verdict.
    let result = &report.results[0];
    assert!(result.matched);
    assert_eq!(result.expected_body.as_deref(), Some("expected text"));
    assert_ne!(result.actual_body, result.expected_body);
    assert_eq!(report.summary.passed, 1);
}

#[tokio::test]
async fn test_stub_requires_an_active_instance() {
    let fake = FakeWireMock::start().await;
    let fx = fixture(&fake.url);
    let stub = add_stub(&fx, "alpha");
    fx.store
        .update_instance(
            fx.instance_id,
            hub_server::store::InstanceUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let tester = StubTester::new(Arc::clone(&fx.store), &config());
    let err = tester
        .test_stub(stub.id, &TestOverrides::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No active WireMock instances found in this project"
    );
}

#[tokio::test]
async fn import_request_turns_journal_entry_into_stub() {
    let fake = FakeWireMock::start().await;
    fake.state.journal.lock().insert(
        "req-1".into(),
        json!({
            "id": "req-1",
            "request": {
                "method": "POST",
                "url": "/api/orders?fast=1",
                "headers": {"Content-Type": "application/json"},
                "body": "{\"sku\": 7}"
            },
            "response": {
                "status": 201,
                "headers": {"Content-Type": "application/json"},
                "body": "{\"orderId\": 42}"
            },
            "wasMatched": false
        }),
    );
    let fx = fixture(&fake.url);

    let importer = RequestImporter::new(Arc::clone(&fx.store), WireMockClient::new(&config()));
    let spec = ImportSpec {
        project_id: fx.project_id,
        name: "imported-order".into(),
        url_match_type: UrlMatchType::UrlPath,
        url_pattern: "/api/orders".into(),
        match_headers: vec!["Content-Type".into(), "X-Absent".into()],
        body_match_type: Some(hub_server::importer::BodyMatchType::EqualToJson),
        body_match_options: Default::default(),
        response_headers: vec!["Content-Type".into()],
        enable_templating: false,
    };
    let stub = importer
        .import_request(fx.instance_id, "req-1", spec)
        .await
        .unwrap();

    assert_eq!(stub.name.as_deref(), Some("imported-order"));
    let doc = serde_json::to_value(&stub.mapping).unwrap();
    assert_eq!(doc["request"]["method"], json!("POST"));
    assert_eq!(doc["request"]["urlPath"], json!("/api/orders"));
    assert_eq!(
        doc["request"]["headers"]["Content-Type"],
        json!({"equalTo": "application/json"})
    );
    assert!(doc["request"]["headers"].get("X-Absent").is_none());
    assert_eq!(
        doc["request"]["bodyPatterns"][0]["equalToJson"],
        json!({"sku": 7})
    );
    assert_eq!(doc["response"]["status"], json!(201));
    assert_eq!(doc["response"]["jsonBody"], json!({"orderId": 42}));

    // The created stub is a regular project stub, visible to listings.
    let listed = fx.store.list_stubs(fx.project_id).unwrap();
    assert!(listed.iter().any(|s| s.id == stub.id));
}

#[tokio::test]
async fn import_request_unknown_id_is_not_found() {
    let fake = FakeWireMock::start().await;
    let fx = fixture(&fake.url);

    let importer = RequestImporter::new(Arc::clone(&fx.store), WireMockClient::new(&config()));
    let spec = ImportSpec {
        project_id: fx.project_id,
        name: "ghost".into(),
        url_match_type: UrlMatchType::Url,
        url_pattern: "/ghost".into(),
        match_headers: vec![],
        body_match_type: None,
        body_match_options: Default::default(),
        response_headers: vec![],
        enable_templating: false,
    };
    let err = importer
        .import_request(fx.instance_id, "nope", spec)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Request not found");
}

#[tokio::test]
async fn health_probe_reports_reachability() {
    let fake = FakeWireMock::start().await;
    let client = WireMockClient::new(&config());
    assert!(client.is_healthy(&fake.url).await);
    assert!(!client.is_healthy("http://127.0.0.1:1").await);
}
