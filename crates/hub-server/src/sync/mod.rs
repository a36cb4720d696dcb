//! Stub-to-instance synchronization.
//!
//! Two operations reconcile local stub records against a remote WireMock
//! server:
//!
//! - [`SyncEngine::sync_stub`] pushes one stub, choosing create vs. update
//!   by whether the stored mapping already carries a remote id.
//! - [`SyncEngine::sync_all`] optionally wipes the instance, then pushes
//!   every active stub of a project in bounded concurrent batches with
//!   per-stub failure accounting. One failed stub never aborts the rest.

use crate::mapping::metadata::inject_hub_metadata;
use crate::mapping::Mapping;
use crate::store::{HubStore, StoreError, Stub, WiremockInstance};
use crate::wiremock::{WireMockClient, WireMockError};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on concurrent outbound pushes within a batch sync.
const SYNC_CHUNK_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Pushing a single stub failed at the transport/admin level.
    #[error("Failed to sync with WireMock: {0}")]
    WireMock(#[source] WireMockError),
    /// The reset precondition of a batch sync failed; nothing was pushed.
    #[error("Failed to reset WireMock mappings: {0}")]
    Reset(#[source] WireMockError),
}

/// Outcome of a batch sync. Per-stub failures are data, not errors.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

pub struct SyncEngine {
    store: Arc<HubStore>,
    client: WireMockClient,
}

impl SyncEngine {
    pub fn new(store: Arc<HubStore>, client: WireMockClient) -> Self {
        Self { store, client }
    }

    /// Push one stub to one instance of its project.
    ///
    /// A mapping that already carries a remote id is updated in place
    /// (PUT); otherwise it is created (POST) and the server-assigned id is
    /// persisted so the next sync of this stub becomes an update. A PUT
    /// answered with 404 means the remote no longer knows the id (e.g. a
    /// reset wiped it since the last sync); we fall back to a fresh create
    /// and record the new id.
    pub async fn sync_stub(&self, stub_id: Uuid, instance_id: Uuid) -> Result<(), SyncError> {
        let stub = self.store.get_stub(stub_id)?;
        let project = self.store.get_project(stub.project_id)?;
        let instance = self.store.get_instance(instance_id)?;
        if instance.project_id != stub.project_id {
            return Err(StoreError::InstanceNotFound.into());
        }

        let outbound = inject_hub_metadata(&stub.mapping, &project);

        match stub.mapping.remote_id() {
            Some(remote_id) => {
                match self
                    .client
                    .update_mapping(&instance.url, remote_id, &outbound)
                    .await
                {
                    Ok(()) => {
                        info!(
                            "Updated stub {} as mapping {} on {}",
                            stub.id, remote_id, instance.url
                        );
                        Ok(())
                    }
                    Err(e) if e.is_not_found() => {
                        warn!(
                            "Mapping {} vanished from {}, re-creating stub {}",
                            remote_id, instance.url, stub.id
                        );
                        self.create_and_record(&stub, &instance, &outbound).await
                    }
                    Err(e) => Err(SyncError::WireMock(e)),
                }
            }
            None => self.create_and_record(&stub, &instance, &outbound).await,
        }
    }

    async fn create_and_record(
        &self,
        stub: &Stub,
        instance: &WiremockInstance,
        outbound: &Mapping,
    ) -> Result<(), SyncError> {
        let created = self
            .client
            .create_mapping(&instance.url, outbound)
            .await
            .map_err(SyncError::WireMock)?;

        if let Some(remote_id) = created.remote_id() {
            self.store.set_stub_remote_id(stub.id, remote_id)?;
            info!(
                "Created stub {} as mapping {} on {}",
                stub.id, remote_id, instance.url
            );
        } else {
            warn!(
                "WireMock at {} returned no id for created mapping of stub {}",
                instance.url, stub.id
            );
        }
        Ok(())
    }

    /// Push every active stub of a project to one instance.
    ///
    /// With `reset_before_sync` the instance is wiped first; if that wipe
    /// fails the whole operation aborts before any stub is pushed. Stubs
    /// are then pushed in chunks of [`SYNC_CHUNK_SIZE`], concurrently
    /// within a chunk, always as creates (the reset guarantees a blank
    /// remote). Failures are tallied per stub and never stop the batch.
    /// Local records are not mutated here.
    pub async fn sync_all(
        &self,
        project_id: Uuid,
        instance_id: Uuid,
        reset_before_sync: bool,
    ) -> Result<SyncReport, SyncError> {
        let project = self.store.get_project(project_id)?;
        let instance = self.store.get_instance(instance_id)?;
        if instance.project_id != project_id {
            return Err(StoreError::InstanceNotFound.into());
        }

        if reset_before_sync {
            self.client
                .reset_mappings(&instance.url)
                .await
                .map_err(SyncError::Reset)?;
            debug!("Reset mappings on {}", instance.url);
        }

        let stubs: Vec<Stub> = self
            .store
            .list_stubs(project_id)?
            .into_iter()
            .filter(|s| s.is_active)
            .collect();

        let mut report = SyncReport::default();
        for chunk in stubs.chunks(SYNC_CHUNK_SIZE) {
            let pushes = chunk.iter().map(|stub| {
                let outbound = inject_hub_metadata(&stub.mapping, &project);
                let url = instance.url.clone();
                let client = self.client.clone();
                async move { client.create_mapping(&url, &outbound).await.map(|_| ()) }
            });

            // Aggregation happens strictly after the whole chunk settles.
            for outcome in join_all(pushes).await {
                match outcome {
                    Ok(()) => report.success += 1,
                    Err(e) => {
                        report.failed += 1;
                        report.errors.push(e.to_string());
                    }
                }
            }
        }

        info!(
            "Synced project {} to {}: {} ok, {} failed",
            project_id, instance.url, report.success, report.failed
        );
        Ok(report)
    }
}
