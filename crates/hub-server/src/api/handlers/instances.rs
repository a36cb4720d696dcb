//! WireMock instance handlers: CRUD plus remote admin-API passthroughs.

use crate::api::types::*;
use crate::api::AppState;
use crate::importer::{ImportError, ImportSpec};
use crate::store::{InstanceUpdate, WiremockInstance};
use crate::wiremock::normalize_unmatched;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstanceRequest {
    project_id: Option<Uuid>,
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdateInstancesRequest {
    instances: Option<Vec<BulkInstanceEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkInstanceEntry {
    name: String,
    url: String,
}

/// An instance URL must be an absolute http(s) URL; anything else is
/// rejected before it can poison later sync/test calls.
fn validate_instance_url(url: &str) -> Result<(), Response<Full<Bytes>>> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "url must be an absolute http(s) URL",
        )),
    }
}

fn require_project_id(query: Option<&str>) -> Result<Uuid, Response<Full<Bytes>>> {
    let raw = query_param(query, "projectId")
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "projectId is required"))?;
    Uuid::parse_str(&raw)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "projectId must be a UUID"))
}

/// GET /api/instances?projectId=...
pub fn handle_list(state: &Arc<AppState>, query: Option<&str>) -> Response<Full<Bytes>> {
    let project_id = match require_project_id(query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.list_instances(project_id) {
        Ok(instances) => ok_data(&instances),
        Err(e) => store_error_response(&e),
    }
}

/// GET /api/instances/:id - includes an on-demand health probe.
pub async fn handle_get(state: Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    let instance = match state.store.get_instance(id) {
        Ok(i) => i,
        Err(e) => return store_error_response(&e),
    };

    let is_healthy = state.wiremock.is_healthy(&instance.url).await;
    let mut data = serde_json::to_value(&instance).unwrap_or_default();
    if let Some(object) = data.as_object_mut() {
        object.insert("isHealthy".into(), serde_json::Value::Bool(is_healthy));
    }
    ok_data(&data)
}

/// POST /api/instances
pub async fn handle_create(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: CreateInstanceRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let (Some(project_id), Some(name), Some(url)) = (body.project_id, body.name, body.url)
    else {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "projectId, name and url are required",
        );
    };
    if name.trim().is_empty() {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "name must not be empty",
        );
    }
    if let Err(resp) = validate_instance_url(&url) {
        return resp;
    }

    match state
        .store
        .create_instance(WiremockInstance::new(project_id, name, url))
    {
        Ok(instance) => {
            info!("Registered instance {} at {}", instance.name, instance.url);
            created_data(&instance)
        }
        Err(e) => store_error_response(&e),
    }
}

/// POST /api/projects/:id/instances/bulk-update - atomically replace a
/// project's instance set. The old instances are deleted and the supplied
/// ones created under one store transaction.
pub async fn handle_bulk_update(
    state: Arc<AppState>,
    project_id: Uuid,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: BulkUpdateInstancesRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let Some(entries) = body.instances else {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "instances is required",
        );
    };
    for entry in &entries {
        if entry.name.trim().is_empty() {
            return error_with_details(
                StatusCode::BAD_REQUEST,
                "Validation error",
                "name must not be empty",
            );
        }
        if let Err(resp) = validate_instance_url(&entry.url) {
            return resp;
        }
    }

    let instances: Vec<WiremockInstance> = entries
        .into_iter()
        .map(|e| WiremockInstance::new(project_id, e.name, e.url))
        .collect();
    match state.store.replace_instances(project_id, instances) {
        Ok((deleted, created)) => {
            info!(
                "Replaced {} instances with {} for project {}",
                deleted,
                created.len(),
                project_id
            );
            ok_data(&serde_json::json!({
                "deleted": deleted,
                "created": created.len(),
                "instances": created,
            }))
        }
        Err(e) => store_error_response(&e),
    }
}

/// PUT /api/instances/:id
pub async fn handle_update(
    state: Arc<AppState>,
    id: Uuid,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let update: InstanceUpdate = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if let Some(url) = &update.url {
        if let Err(resp) = validate_instance_url(url) {
            return resp;
        }
    }

    match state.store.update_instance(id, update) {
        Ok(instance) => ok_data(&instance),
        Err(e) => store_error_response(&e),
    }
}

/// DELETE /api/instances/:id
pub fn handle_delete(state: &Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    match state.store.delete_instance(id) {
        Ok(()) => ok_message("Instance deleted successfully"),
        Err(e) => store_error_response(&e),
    }
}

/// GET /api/instances/:id/mappings - what the remote actually holds.
pub async fn handle_mappings(state: Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    let instance = match state.store.get_instance(id) {
        Ok(i) => i,
        Err(e) => return store_error_response(&e),
    };
    match state.wiremock.list_mappings(&instance.url).await {
        Ok(mappings) => ok_data(&mappings),
        Err(e) => wiremock_error_response("Failed to fetch mappings from WireMock", &e),
    }
}

/// GET /api/instances/:id/requests
pub async fn handle_requests(state: Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    let instance = match state.store.get_instance(id) {
        Ok(i) => i,
        Err(e) => return store_error_response(&e),
    };
    match state.wiremock.list_requests(&instance.url).await {
        Ok(requests) => ok_data(&requests),
        Err(e) => wiremock_error_response("Failed to fetch requests from WireMock", &e),
    }
}

/// GET /api/instances/:id/requests/unmatched - normalized into the same
/// shape as the matched journal.
pub async fn handle_unmatched_requests(state: Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    let instance = match state.store.get_instance(id) {
        Ok(i) => i,
        Err(e) => return store_error_response(&e),
    };
    match state.wiremock.list_unmatched_requests(&instance.url).await {
        Ok(raw) => ok_data(&normalize_unmatched(&raw)),
        Err(e) => wiremock_error_response("Failed to fetch unmatched requests from WireMock", &e),
    }
}

/// GET /api/instances/:id/requests/:requestId
pub async fn handle_get_request(
    state: Arc<AppState>,
    id: Uuid,
    request_id: &str,
) -> Response<Full<Bytes>> {
    let instance = match state.store.get_instance(id) {
        Ok(i) => i,
        Err(e) => return store_error_response(&e),
    };
    match state.wiremock.get_request(&instance.url, request_id).await {
        Ok(logged) => ok_data(&logged),
        Err(e) if e.is_not_found() => {
            error_response(StatusCode::NOT_FOUND, "Request not found")
        }
        Err(e) => wiremock_error_response("Failed to fetch request from WireMock", &e),
    }
}

/// POST /api/instances/:id/requests/:requestId/import - replay a logged
/// request as a new stub in the target project.
pub async fn handle_import_request(
    state: Arc<AppState>,
    id: Uuid,
    request_id: &str,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    use http_body_util::BodyExt;
    let bytes = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            )
        }
    };
    let spec: ImportSpec = match serde_json::from_slice(&bytes) {
        Ok(s) => s,
        Err(e) => {
            return error_with_details(StatusCode::BAD_REQUEST, "Validation error", &e.to_string())
        }
    };

    match state.importer.import_request(id, request_id, spec).await {
        Ok(stub) => created_data(&stub),
        Err(ImportError::Store(e)) => store_error_response(&e),
        Err(ImportError::RequestNotFound) => {
            error_response(StatusCode::NOT_FOUND, "Request not found")
        }
        Err(ImportError::WireMock(e)) => {
            wiremock_error_response("Failed to fetch request from WireMock", &e)
        }
        Err(e @ ImportError::InvalidMapping(_)) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

/// DELETE /api/instances/:id/requests - clear the remote journal.
pub async fn handle_clear_requests(state: Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    let instance = match state.store.get_instance(id) {
        Ok(i) => i,
        Err(e) => return store_error_response(&e),
    };
    match state.wiremock.clear_requests(&instance.url).await {
        Ok(()) => ok_message("Request log cleared successfully"),
        Err(e) => wiremock_error_response("Failed to clear requests from WireMock", &e),
    }
}

/// POST /api/instances/:id/reset - wipe every mapping on the remote. This
/// is the standalone wipe (`DELETE /__admin/mappings`), distinct from the
/// reset step inside a batch sync.
pub async fn handle_reset(state: Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    let instance = match state.store.get_instance(id) {
        Ok(i) => i,
        Err(e) => return store_error_response(&e),
    };
    match state.wiremock.delete_all_mappings(&instance.url).await {
        Ok(()) => {
            info!("Reset WireMock instance {} ({})", instance.name, instance.url);
            ok_message("WireMock instance reset successfully")
        }
        Err(e) => wiremock_error_response("Failed to reset WireMock instance", &e),
    }
}
