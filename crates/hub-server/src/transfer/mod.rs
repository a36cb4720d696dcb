//! Stub export/import file format.
//!
//! Exports are versioned JSON documents carrying a project's stubs in
//! creation order. Import validates loosely: version and project name are
//! informational, and an entry with an unparseable mapping is skipped and
//! reported rather than aborting the batch.

use crate::mapping::Mapping;
use crate::store::{HubStore, StoreError, Stub};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

pub const EXPORT_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The on-disk export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
    pub stubs: Vec<ExportedStub>,
}

/// One stub in an export document. The mapping stays a raw value until
/// import time so a single bad entry can be skipped on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedStub {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub mapping: Value,
}

fn default_active() -> bool {
    true
}

/// Outcome of an import batch; per-entry failures are data.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Export every stub of a project, in creation order so an import recreates
/// them in the order they were first defined.
pub fn export_project(store: &Arc<HubStore>, project_id: Uuid) -> Result<ExportDocument, TransferError> {
    let project = store.get_project(project_id)?;
    let stubs = store.list_stubs_creation_order(project_id)?;

    Ok(ExportDocument {
        version: Some(EXPORT_FORMAT_VERSION.to_string()),
        project_name: Some(project.name),
        exported_at: Some(Utc::now()),
        stubs: stubs
            .into_iter()
            .map(|stub| ExportedStub {
                name: stub.name,
                description: stub.description,
                is_active: stub.is_active,
                mapping: serde_json::to_value(&stub.mapping).unwrap_or(Value::Null),
            })
            .collect(),
    })
}

/// Import an export document into a project. Entries whose mapping fails to
/// parse are skipped and reported; the rest are created.
pub fn import_project(
    store: &Arc<HubStore>,
    project_id: Uuid,
    document: ExportDocument,
) -> Result<ImportReport, TransferError> {
    store.get_project(project_id)?;

    let mut report = ImportReport::default();
    for entry in document.stubs {
        let mapping: Mapping = match serde_json::from_value(entry.mapping) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping stub {:?} on import: {}", entry.name, e);
                report.skipped += 1;
                report.errors.push(format!(
                    "Invalid mapping for stub {}: {e}",
                    entry.name.as_deref().unwrap_or("(unnamed)")
                ));
                continue;
            }
        };

        let mut stub = Stub::new(project_id, entry.name, entry.description, mapping);
        stub.is_active = entry.is_active;
        store.create_stub(stub)?;
        report.imported += 1;
    }

    Ok(report)
}
