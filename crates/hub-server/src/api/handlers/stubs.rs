//! Stub CRUD, test, sync and export/import handlers.

use crate::api::types::*;
use crate::api::AppState;
use crate::mapping::Mapping;
use crate::store::{Stub, StubUpdate};
use crate::sync::SyncError;
use crate::tester::{StubTestError, TestOverrides};
use crate::transfer::{self, ExportDocument, TransferError};
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
struct CreateStubRequest {
    project_id: Option<Uuid>,
    name: Option<String>,
    description: Option<String>,
    mapping: Option<Mapping>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncStubRequest {
    instance_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncAllRequest {
    project_id: Option<Uuid>,
    instance_id: Option<Uuid>,
    reset_before_sync: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportStubsRequest {
    project_id: Option<Uuid>,
    data: Option<ExportDocument>,
}

fn require_project_id(query: Option<&str>) -> Result<Uuid, Response<Full<Bytes>>> {
    let raw = query_param(query, "projectId")
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "projectId is required"))?;
    Uuid::parse_str(&raw)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "projectId must be a UUID"))
}

/// GET /api/stubs?projectId=...
pub fn handle_list(state: &Arc<AppState>, query: Option<&str>) -> Response<Full<Bytes>> {
    let project_id = match require_project_id(query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.list_stubs(project_id) {
        Ok(stubs) => ok_data(&stubs),
        Err(e) => store_error_response(&e),
    }
}

/// GET /api/stubs/:id
pub fn handle_get(state: &Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    match state.store.get_stub(id) {
        Ok(stub) => ok_data(&stub),
        Err(e) => store_error_response(&e),
    }
}

/// POST /api/stubs
pub async fn handle_create(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: CreateStubRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let (Some(project_id), Some(mapping)) = (body.project_id, body.mapping) else {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "projectId and mapping are required",
        );
    };

    match state.store.create_stub(Stub::new(
        project_id,
        body.name,
        body.description,
        mapping,
    )) {
        Ok(stub) => created_data(&stub),
        Err(e) => store_error_response(&e),
    }
}

/// PUT /api/stubs/:id
pub async fn handle_update(
    state: Arc<AppState>,
    id: Uuid,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let update: StubUpdate = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match state.store.update_stub(id, update) {
        Ok(stub) => ok_data(&stub),
        Err(e) => store_error_response(&e),
    }
}

/// DELETE /api/stubs/:id
pub fn handle_delete(state: &Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    match state.store.delete_stub(id) {
        Ok(()) => ok_message("Stub deleted successfully"),
        Err(e) => store_error_response(&e),
    }
}

/// DELETE /api/stubs?projectId=...
pub fn handle_delete_all(state: &Arc<AppState>, query: Option<&str>) -> Response<Full<Bytes>> {
    let project_id = match require_project_id(query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.store.delete_project_stubs(project_id) {
        Ok(count) => ok_data(&serde_json::json!({ "deletedCount": count })),
        Err(e) => store_error_response(&e),
    }
}

/// POST /api/stubs/:id/test - fire the stub's request at every active
/// instance of its project and compare responses.
pub async fn handle_test(
    state: Arc<AppState>,
    id: Uuid,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let overrides: TestOverrides = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match state.tester.test_stub(id, &overrides).await {
        Ok(report) => ok_data(&report),
        Err(StubTestError::Store(e)) => store_error_response(&e),
        Err(e @ StubTestError::Build(_)) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e @ StubTestError::NoActiveInstances) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

/// POST /api/stubs/:id/sync - push one stub to one instance.
pub async fn handle_sync(
    state: Arc<AppState>,
    id: Uuid,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: SyncStubRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let Some(instance_id) = body.instance_id else {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "instanceId is required",
        );
    };

    match state.sync.sync_stub(id, instance_id).await {
        Ok(()) => ok_message("Stub synced to WireMock successfully"),
        Err(SyncError::Store(e)) => store_error_response(&e),
        Err(SyncError::WireMock(e)) | Err(SyncError::Reset(e)) => {
            wiremock_error_response("Failed to sync with WireMock", &e)
        }
    }
}

/// POST /api/stubs/sync-all - push every active stub of a project to one
/// instance, optionally wiping the instance first. Per-stub failures are
/// reported as data; only a failed reset precondition produces a 502.
pub async fn handle_sync_all(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: SyncAllRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let (Some(project_id), Some(instance_id)) = (body.project_id, body.instance_id) else {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "projectId and instanceId are required",
        );
    };
    let reset_before_sync = body.reset_before_sync.unwrap_or(true);

    match state
        .sync
        .sync_all(project_id, instance_id, reset_before_sync)
        .await
    {
        Ok(report) => ok_data(&report),
        Err(SyncError::Store(e)) => store_error_response(&e),
        Err(SyncError::Reset(e)) => {
            wiremock_error_response("Failed to reset WireMock mappings", &e)
        }
        Err(SyncError::WireMock(e)) => {
            wiremock_error_response("Failed to sync with WireMock", &e)
        }
    }
}

/// GET /api/stubs/export?projectId=... - the export document is returned
/// raw, not wrapped in the envelope, so it can be saved to a file as-is.
pub fn handle_export(state: &Arc<AppState>, query: Option<&str>) -> Response<Full<Bytes>> {
    let project_id = match require_project_id(query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match transfer::export_project(&state.store, project_id) {
        Ok(document) => json_response(StatusCode::OK, &document),
        Err(TransferError::Store(e)) => store_error_response(&e),
    }
}

/// POST /api/stubs/import
pub async fn handle_import(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: ImportStubsRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let (Some(project_id), Some(data)) = (body.project_id, body.data) else {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "projectId and data are required",
        );
    };

    match transfer::import_project(&state.store, project_id, data) {
        Ok(report) => {
            info!(
                "Imported {} stubs into project {} ({} skipped)",
                report.imported, project_id, report.skipped
            );
            ok_data(&report)
        }
        Err(TransferError::Store(e)) => store_error_response(&e),
    }
}
