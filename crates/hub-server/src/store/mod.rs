//! Local persistence for hub records.
//!
//! Projects own WireMock instances and stubs. The stub record is the durable
//! source of truth; whatever a remote WireMock server holds is a disposable
//! projection of it.

mod memory;

pub use memory::HubStore;

use crate::mapping::Mapping;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Stub not found")]
    StubNotFound,
    #[error("WireMock instance not found")]
    InstanceNotFound,
    #[error("Failed to persist store: {0}")]
    Persist(String),
}

/// A project groups the stubs and instances of one mocked system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One addressable remote WireMock server.
///
/// Health is never persisted; it is probed on demand against the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiremockInstance {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    /// Absolute base URL, validated at the API boundary.
    pub url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WiremockInstance {
    pub fn new(project_id: Uuid, name: String, url: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            name,
            url,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A locally stored stub definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stub {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mapping: Mapping,
    pub is_active: bool,
    /// Incremented whenever an update changes the mapping content.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stub {
    pub fn new(
        project_id: Uuid,
        name: Option<String>,
        description: Option<String>,
        mapping: Mapping,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            name,
            description,
            mapping,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Partial update for an instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub is_active: Option<bool>,
}

/// Partial update for a stub.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub mapping: Option<Mapping>,
    pub is_active: Option<bool>,
}
