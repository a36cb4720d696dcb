//! Route dispatch for the hub API.

use crate::api::handlers::{instances, projects, stubs, system};
use crate::api::types::not_found;
use crate::api::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Parsed route for stub endpoints under `/api/stubs`.
enum StubRoute {
    /// GET/POST/DELETE /api/stubs
    Collection,
    /// POST /api/stubs/sync-all
    SyncAll,
    /// GET /api/stubs/export
    Export,
    /// POST /api/stubs/import
    Import,
    /// GET/PUT/DELETE /api/stubs/:id
    ById(Uuid),
    /// POST /api/stubs/:id/test
    Test(Uuid),
    /// POST /api/stubs/:id/sync
    Sync(Uuid),
}

impl StubRoute {
    fn parse(segments: &[&str]) -> Option<Self> {
        match segments {
            [] => Some(StubRoute::Collection),
            ["sync-all"] => Some(StubRoute::SyncAll),
            ["export"] => Some(StubRoute::Export),
            ["import"] => Some(StubRoute::Import),
            [id] => Uuid::parse_str(id).ok().map(StubRoute::ById),
            [id, "test"] => Uuid::parse_str(id).ok().map(StubRoute::Test),
            [id, "sync"] => Uuid::parse_str(id).ok().map(StubRoute::Sync),
            _ => None,
        }
    }
}

/// Parsed route for instance endpoints under `/api/instances`.
enum InstanceRoute {
    /// GET/POST /api/instances
    Collection,
    /// GET/PUT/DELETE /api/instances/:id
    ById(Uuid),
    /// GET /api/instances/:id/mappings
    Mappings(Uuid),
    /// GET/DELETE /api/instances/:id/requests
    Requests(Uuid),
    /// GET /api/instances/:id/requests/unmatched
    UnmatchedRequests(Uuid),
    /// GET /api/instances/:id/requests/:requestId
    RequestById(Uuid, String),
    /// POST /api/instances/:id/requests/:requestId/import
    ImportRequest(Uuid, String),
    /// POST /api/instances/:id/reset
    Reset(Uuid),
}

impl InstanceRoute {
    fn parse(segments: &[&str]) -> Option<Self> {
        match segments {
            [] => Some(InstanceRoute::Collection),
            [id] => Uuid::parse_str(id).ok().map(InstanceRoute::ById),
            [id, "mappings"] => Uuid::parse_str(id).ok().map(InstanceRoute::Mappings),
            [id, "requests"] => Uuid::parse_str(id).ok().map(InstanceRoute::Requests),
            [id, "requests", "unmatched"] => {
                Uuid::parse_str(id).ok().map(InstanceRoute::UnmatchedRequests)
            }
            [id, "requests", request_id] => Uuid::parse_str(id)
                .ok()
                .map(|id| InstanceRoute::RequestById(id, (*request_id).to_string())),
            [id, "requests", request_id, "import"] => Uuid::parse_str(id)
                .ok()
                .map(|id| InstanceRoute::ImportRequest(id, (*request_id).to_string())),
            [id, "reset"] => Uuid::parse_str(id).ok().map(InstanceRoute::Reset),
            _ => None,
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());

    debug!("Hub API: {} {}", method, path);

    let response = route_by_path(&method, &path, query.as_deref(), req, state).await;
    Ok(response)
}

/// Route based on path
async fn route_by_path(
    method: &Method,
    path: &str,
    query: Option<&str>,
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    // Fast path
    if method == Method::GET && path == "/health" {
        return system::handle_health();
    }

    if let Some(rest) = strip_resource(path, "/api/projects") {
        return route_project(method, &rest, req, state).await;
    }
    if let Some(rest) = strip_resource(path, "/api/stubs") {
        return route_stub(method, &rest, query, req, state).await;
    }
    if let Some(rest) = strip_resource(path, "/api/instances") {
        return route_instance(method, &rest, query, req, state).await;
    }

    not_found()
}

/// Split a path into segments after `prefix`, or `None` if the path does
/// not belong to that resource. `/api/stubs` and `/api/stubs/` both yield
/// an empty segment list.
fn strip_resource(path: &str, prefix: &str) -> Option<Vec<String>> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    let rest = rest.strip_prefix('/')?;
    Some(
        rest.split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect(),
    )
}

async fn route_project(
    method: &Method,
    segments: &[String],
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let segments: Vec<&str> = segments.iter().map(|s| s.as_str()).collect();
    match segments.as_slice() {
        [] => match *method {
            Method::GET => projects::handle_list(&state),
            Method::POST => projects::handle_create(state, req).await,
            _ => not_found(),
        },
        [id] => {
            let Ok(id) = Uuid::parse_str(id) else {
                return not_found();
            };
            match *method {
                Method::GET => projects::handle_get(&state, id),
                Method::PUT => projects::handle_update(state, id, req).await,
                Method::DELETE => projects::handle_delete(&state, id),
                _ => not_found(),
            }
        }
        [id, "instances", "bulk-update"] => {
            let Ok(id) = Uuid::parse_str(id) else {
                return not_found();
            };
            match *method {
                Method::POST => instances::handle_bulk_update(state, id, req).await,
                _ => not_found(),
            }
        }
        _ => not_found(),
    }
}

async fn route_stub(
    method: &Method,
    segments: &[String],
    query: Option<&str>,
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let segments: Vec<&str> = segments.iter().map(|s| s.as_str()).collect();
    let route = match StubRoute::parse(&segments) {
        Some(r) => r,
        None => return not_found(),
    };

    match (method, route) {
        (&Method::GET, StubRoute::Collection) => stubs::handle_list(&state, query),
        (&Method::POST, StubRoute::Collection) => stubs::handle_create(state, req).await,
        (&Method::DELETE, StubRoute::Collection) => stubs::handle_delete_all(&state, query),

        (&Method::POST, StubRoute::SyncAll) => stubs::handle_sync_all(state, req).await,
        (&Method::GET, StubRoute::Export) => stubs::handle_export(&state, query),
        (&Method::POST, StubRoute::Import) => stubs::handle_import(state, req).await,

        (&Method::GET, StubRoute::ById(id)) => stubs::handle_get(&state, id),
        (&Method::PUT, StubRoute::ById(id)) => stubs::handle_update(state, id, req).await,
        (&Method::DELETE, StubRoute::ById(id)) => stubs::handle_delete(&state, id),

        (&Method::POST, StubRoute::Test(id)) => stubs::handle_test(state, id, req).await,
        (&Method::POST, StubRoute::Sync(id)) => stubs::handle_sync(state, id, req).await,

        _ => not_found(),
    }
}

async fn route_instance(
    method: &Method,
    segments: &[String],
    query: Option<&str>,
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let segments: Vec<&str> = segments.iter().map(|s| s.as_str()).collect();
    let route = match InstanceRoute::parse(&segments) {
        Some(r) => r,
        None => return not_found(),
    };

    match (method, route) {
        (&Method::GET, InstanceRoute::Collection) => instances::handle_list(&state, query),
        (&Method::POST, InstanceRoute::Collection) => instances::handle_create(state, req).await,

        (&Method::GET, InstanceRoute::ById(id)) => instances::handle_get(state, id).await,
        (&Method::PUT, InstanceRoute::ById(id)) => instances::handle_update(state, id, req).await,
        (&Method::DELETE, InstanceRoute::ById(id)) => instances::handle_delete(&state, id),

        (&Method::GET, InstanceRoute::Mappings(id)) => instances::handle_mappings(state, id).await,
        (&Method::GET, InstanceRoute::Requests(id)) => instances::handle_requests(state, id).await,
        (&Method::DELETE, InstanceRoute::Requests(id)) => {
            instances::handle_clear_requests(state, id).await
        }
        (&Method::GET, InstanceRoute::UnmatchedRequests(id)) => {
            instances::handle_unmatched_requests(state, id).await
        }
        (&Method::GET, InstanceRoute::RequestById(id, request_id)) => {
            instances::handle_get_request(state, id, &request_id).await
        }
        (&Method::POST, InstanceRoute::ImportRequest(id, request_id)) => {
            instances::handle_import_request(state, id, &request_id, req).await
        }
        (&Method::POST, InstanceRoute::Reset(id)) => instances::handle_reset(state, id).await,

        _ => not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "0191f3a0-8c2e-7d10-b0a4-5a1a62a1f000";

    #[test]
    fn test_stub_route_parse() {
        assert!(matches!(
            StubRoute::parse(&[]),
            Some(StubRoute::Collection)
        ));
        assert!(matches!(
            StubRoute::parse(&["sync-all"]),
            Some(StubRoute::SyncAll)
        ));
        assert!(matches!(
            StubRoute::parse(&["export"]),
            Some(StubRoute::Export)
        ));
        assert!(matches!(
            StubRoute::parse(&["import"]),
            Some(StubRoute::Import)
        ));
        assert!(matches!(StubRoute::parse(&[ID]), Some(StubRoute::ById(_))));
        assert!(matches!(
            StubRoute::parse(&[ID, "test"]),
            Some(StubRoute::Test(_))
        ));
        assert!(matches!(
            StubRoute::parse(&[ID, "sync"]),
            Some(StubRoute::Sync(_))
        ));

        // Invalid routes
        assert!(StubRoute::parse(&["not-a-uuid"]).is_none());
        assert!(StubRoute::parse(&[ID, "unknown"]).is_none());
    }

    #[test]
    fn test_instance_route_parse() {
        assert!(matches!(
            InstanceRoute::parse(&[]),
            Some(InstanceRoute::Collection)
        ));
        assert!(matches!(
            InstanceRoute::parse(&[ID]),
            Some(InstanceRoute::ById(_))
        ));
        assert!(matches!(
            InstanceRoute::parse(&[ID, "mappings"]),
            Some(InstanceRoute::Mappings(_))
        ));
        assert!(matches!(
            InstanceRoute::parse(&[ID, "requests"]),
            Some(InstanceRoute::Requests(_))
        ));
        // "unmatched" must win over the request-id pattern
        assert!(matches!(
            InstanceRoute::parse(&[ID, "requests", "unmatched"]),
            Some(InstanceRoute::UnmatchedRequests(_))
        ));
        assert!(matches!(
            InstanceRoute::parse(&[ID, "requests", "abc-123"]),
            Some(InstanceRoute::RequestById(_, _))
        ));
        assert!(matches!(
            InstanceRoute::parse(&[ID, "requests", "abc-123", "import"]),
            Some(InstanceRoute::ImportRequest(_, _))
        ));
        assert!(matches!(
            InstanceRoute::parse(&[ID, "reset"]),
            Some(InstanceRoute::Reset(_))
        ));

        assert!(InstanceRoute::parse(&["nope"]).is_none());
        assert!(InstanceRoute::parse(&[ID, "unknown"]).is_none());
    }

    #[test]
    fn test_strip_resource() {
        assert_eq!(strip_resource("/api/stubs", "/api/stubs"), Some(vec![]));
        assert_eq!(strip_resource("/api/stubs/", "/api/stubs"), Some(vec![]));
        assert_eq!(
            strip_resource("/api/stubs/sync-all", "/api/stubs"),
            Some(vec!["sync-all".to_string()])
        );
        assert_eq!(strip_resource("/api/stubsX", "/api/stubs"), None);
        assert_eq!(strip_resource("/api/projects", "/api/stubs"), None);
    }
}
