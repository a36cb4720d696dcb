//! Management REST API for the hub:
//! - Project, instance and stub CRUD
//! - Stub testing and sync to WireMock instances
//! - Request-log browsing and stub import from recorded traffic
//! - Project export/import
//!
//! The API listens on a configurable address (default: 127.0.0.1:3001).

mod handlers;
mod router;
mod server;
mod types;

pub use server::ApiServer;

use crate::config::WireMockConfig;
use crate::importer::RequestImporter;
use crate::store::HubStore;
use crate::sync::SyncEngine;
use crate::tester::StubTester;
use crate::wiremock::WireMockClient;
use std::sync::Arc;

/// Shared state handed to every request handler.
pub struct AppState {
    pub store: Arc<HubStore>,
    pub wiremock: WireMockClient,
    pub sync: SyncEngine,
    pub tester: StubTester,
    pub importer: RequestImporter,
}

impl AppState {
    pub fn new(store: Arc<HubStore>, config: &WireMockConfig) -> Self {
        let wiremock = WireMockClient::new(config);
        Self {
            sync: SyncEngine::new(Arc::clone(&store), wiremock.clone()),
            tester: StubTester::new(Arc::clone(&store), config),
            importer: RequestImporter::new(Arc::clone(&store), wiremock.clone()),
            wiremock,
            store,
        }
    }
}
