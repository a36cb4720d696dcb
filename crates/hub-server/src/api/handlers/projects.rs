//! Project CRUD handlers.

use crate::api::types::*;
use crate::api::AppState;
use crate::store::{Project, ProjectUpdate};
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
struct CreateProjectRequest {
    name: String,
    description: Option<String>,
}

/// GET /api/projects
pub fn handle_list(state: &Arc<AppState>) -> Response<Full<Bytes>> {
    ok_data(&state.store.list_projects())
}

/// GET /api/projects/:id
pub fn handle_get(state: &Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    match state.store.get_project(id) {
        Ok(project) => ok_data(&project),
        Err(e) => store_error_response(&e),
    }
}

/// POST /api/projects
pub async fn handle_create(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let body: CreateProjectRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if body.name.trim().is_empty() {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "name is required",
        );
    }

    match state
        .store
        .create_project(Project::new(body.name, body.description))
    {
        Ok(project) => {
            info!("Created project {} ({})", project.name, project.id);
            created_data(&project)
        }
        Err(e) => store_error_response(&e),
    }
}

/// PUT /api/projects/:id
pub async fn handle_update(
    state: Arc<AppState>,
    id: Uuid,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let update: ProjectUpdate = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if matches!(&update.name, Some(name) if name.trim().is_empty()) {
        return error_with_details(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "name must not be empty",
        );
    }

    match state.store.update_project(id, update) {
        Ok(project) => ok_data(&project),
        Err(e) => store_error_response(&e),
    }
}

/// DELETE /api/projects/:id
pub fn handle_delete(state: &Arc<AppState>, id: Uuid) -> Response<Full<Bytes>> {
    match state.store.delete_project(id) {
        Ok(()) => {
            info!("Deleted project {}", id);
            ok_message("Project deleted successfully")
        }
        Err(e) => store_error_response(&e),
    }
}
