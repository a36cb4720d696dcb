//! In-memory hub store with optional JSON snapshot persistence.
//!
//! All records live in maps behind a single `parking_lot::RwLock`. When a
//! data file is configured, every mutation serializes a snapshot and writes
//! it atomically (temp file + rename) so a crash never leaves a half-written
//! store on disk.

use super::{
    InstanceUpdate, Project, ProjectUpdate, StoreError, Stub, StubUpdate, WiremockInstance,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    projects: HashMap<Uuid, Project>,
    instances: HashMap<Uuid, WiremockInstance>,
    stubs: HashMap<Uuid, Stub>,
}

/// Thread-safe store for projects, instances and stubs.
pub struct HubStore {
    data: RwLock<StoreData>,
    data_file: Option<PathBuf>,
}

impl HubStore {
    /// Volatile store, nothing written to disk. Used in tests and for
    /// throwaway sessions.
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            data_file: None,
        }
    }

    /// Load the snapshot at `path`, or start empty if the file does not
    /// exist yet. Subsequent mutations are persisted back to the same path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| StoreError::Persist(format!("read {}: {e}", path.display())))?;
            let data: StoreData = serde_json::from_str(&contents)
                .map_err(|e| StoreError::Persist(format!("parse {}: {e}", path.display())))?;
            info!(
                "Loaded store from {} ({} projects, {} stubs, {} instances)",
                path.display(),
                data.projects.len(),
                data.stubs.len(),
                data.instances.len()
            );
            data
        } else {
            info!("No store at {}, starting empty", path.display());
            StoreData::default()
        };

        Ok(Self {
            data: RwLock::new(data),
            data_file: Some(path),
        })
    }

    /// Write a snapshot atomically. Called with the write lock held so a
    /// snapshot always reflects a consistent state.
    fn persist(&self, data: &StoreData) -> Result<(), StoreError> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| StoreError::Persist(format!("serialize: {e}")))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::Persist(format!("create temp file: {e}")))?;
        std::fs::write(tmp.path(), &json)
            .map_err(|e| StoreError::Persist(format!("write temp file: {e}")))?;
        tmp.persist(path)
            .map_err(|e| StoreError::Persist(format!("rename into place: {e}")))?;
        debug!("Persisted store snapshot to {}", path.display());
        Ok(())
    }

    // ========================================================================
    // Projects
    // ========================================================================

    /// All projects, most recently created first.
    pub fn list_projects(&self) -> Vec<Project> {
        let data = self.data.read();
        let mut projects: Vec<Project> = data.projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }

    pub fn get_project(&self, id: Uuid) -> Result<Project, StoreError> {
        self.data
            .read()
            .projects
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProjectNotFound)
    }

    pub fn create_project(&self, project: Project) -> Result<Project, StoreError> {
        let mut data = self.data.write();
        data.projects.insert(project.id, project.clone());
        self.persist(&data)?;
        Ok(project)
    }

    pub fn update_project(&self, id: Uuid, update: ProjectUpdate) -> Result<Project, StoreError> {
        let mut data = self.data.write();
        let project = data
            .projects
            .get_mut(&id)
            .ok_or(StoreError::ProjectNotFound)?;
        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(description) = update.description {
            project.description = Some(description);
        }
        project.updated_at = chrono::Utc::now();
        let project = project.clone();
        self.persist(&data)?;
        Ok(project)
    }

    /// Delete a project and cascade to its instances and stubs.
    pub fn delete_project(&self, id: Uuid) -> Result<(), StoreError> {
        let mut data = self.data.write();
        data.projects
            .remove(&id)
            .ok_or(StoreError::ProjectNotFound)?;
        data.instances.retain(|_, i| i.project_id != id);
        data.stubs.retain(|_, s| s.project_id != id);
        self.persist(&data)?;
        Ok(())
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Instances of a project, most recently created first.
    pub fn list_instances(&self, project_id: Uuid) -> Result<Vec<WiremockInstance>, StoreError> {
        let data = self.data.read();
        if !data.projects.contains_key(&project_id) {
            return Err(StoreError::ProjectNotFound);
        }
        let mut instances: Vec<WiremockInstance> = data
            .instances
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect();
        instances.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(instances)
    }

    /// Active instances of a project, the sync/test fan-out targets.
    pub fn active_instances(&self, project_id: Uuid) -> Result<Vec<WiremockInstance>, StoreError> {
        Ok(self
            .list_instances(project_id)?
            .into_iter()
            .filter(|i| i.is_active)
            .collect())
    }

    pub fn get_instance(&self, id: Uuid) -> Result<WiremockInstance, StoreError> {
        self.data
            .read()
            .instances
            .get(&id)
            .cloned()
            .ok_or(StoreError::InstanceNotFound)
    }

    pub fn create_instance(
        &self,
        instance: WiremockInstance,
    ) -> Result<WiremockInstance, StoreError> {
        let mut data = self.data.write();
        if !data.projects.contains_key(&instance.project_id) {
            return Err(StoreError::ProjectNotFound);
        }
        data.instances.insert(instance.id, instance.clone());
        self.persist(&data)?;
        Ok(instance)
    }

    pub fn update_instance(
        &self,
        id: Uuid,
        update: InstanceUpdate,
    ) -> Result<WiremockInstance, StoreError> {
        let mut data = self.data.write();
        let instance = data
            .instances
            .get_mut(&id)
            .ok_or(StoreError::InstanceNotFound)?;
        if let Some(name) = update.name {
            instance.name = name;
        }
        if let Some(url) = update.url {
            instance.url = url;
        }
        if let Some(is_active) = update.is_active {
            instance.is_active = is_active;
        }
        instance.updated_at = chrono::Utc::now();
        let instance = instance.clone();
        self.persist(&data)?;
        Ok(instance)
    }

    /// Atomically replace a project's instance set: every existing instance
    /// of the project is deleted and the supplied ones created, all under
    /// one write lock. Returns how many were removed along with the created
    /// records.
    pub fn replace_instances(
        &self,
        project_id: Uuid,
        instances: Vec<WiremockInstance>,
    ) -> Result<(usize, Vec<WiremockInstance>), StoreError> {
        let mut data = self.data.write();
        if !data.projects.contains_key(&project_id) {
            return Err(StoreError::ProjectNotFound);
        }
        let before = data.instances.len();
        data.instances.retain(|_, i| i.project_id != project_id);
        let deleted = before - data.instances.len();
        for instance in &instances {
            data.instances.insert(instance.id, instance.clone());
        }
        self.persist(&data)?;
        Ok((deleted, instances))
    }

    pub fn delete_instance(&self, id: Uuid) -> Result<(), StoreError> {
        let mut data = self.data.write();
        data.instances
            .remove(&id)
            .ok_or(StoreError::InstanceNotFound)?;
        self.persist(&data)?;
        Ok(())
    }

    // ========================================================================
    // Stubs
    // ========================================================================

    /// Stubs of a project, most recently updated first.
    pub fn list_stubs(&self, project_id: Uuid) -> Result<Vec<Stub>, StoreError> {
        let data = self.data.read();
        if !data.projects.contains_key(&project_id) {
            return Err(StoreError::ProjectNotFound);
        }
        let mut stubs: Vec<Stub> = data
            .stubs
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        stubs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(stubs)
    }

    /// Stubs of a project in creation order. Export uses this so an import
    /// recreates them in the order they were first defined.
    pub fn list_stubs_creation_order(&self, project_id: Uuid) -> Result<Vec<Stub>, StoreError> {
        let mut stubs = self.list_stubs(project_id)?;
        stubs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(stubs)
    }

    pub fn get_stub(&self, id: Uuid) -> Result<Stub, StoreError> {
        self.data
            .read()
            .stubs
            .get(&id)
            .cloned()
            .ok_or(StoreError::StubNotFound)
    }

    pub fn create_stub(&self, stub: Stub) -> Result<Stub, StoreError> {
        let mut data = self.data.write();
        if !data.projects.contains_key(&stub.project_id) {
            return Err(StoreError::ProjectNotFound);
        }
        data.stubs.insert(stub.id, stub.clone());
        self.persist(&data)?;
        Ok(stub)
    }

    pub fn update_stub(&self, id: Uuid, update: StubUpdate) -> Result<Stub, StoreError> {
        let mut data = self.data.write();
        let stub = data.stubs.get_mut(&id).ok_or(StoreError::StubNotFound)?;
        if let Some(name) = update.name {
            stub.name = Some(name);
        }
        if let Some(description) = update.description {
            stub.description = Some(description);
        }
        if let Some(mapping) = update.mapping {
            // Version tracks mapping content, not the other fields.
            if mapping != stub.mapping {
                stub.version += 1;
            }
            stub.mapping = mapping;
        }
        if let Some(is_active) = update.is_active {
            stub.is_active = is_active;
        }
        stub.updated_at = chrono::Utc::now();
        let stub = stub.clone();
        self.persist(&data)?;
        Ok(stub)
    }

    pub fn delete_stub(&self, id: Uuid) -> Result<(), StoreError> {
        let mut data = self.data.write();
        data.stubs.remove(&id).ok_or(StoreError::StubNotFound)?;
        self.persist(&data)?;
        Ok(())
    }

    /// Delete every stub of a project. Returns how many were removed.
    pub fn delete_project_stubs(&self, project_id: Uuid) -> Result<usize, StoreError> {
        let mut data = self.data.write();
        if !data.projects.contains_key(&project_id) {
            return Err(StoreError::ProjectNotFound);
        }
        let before = data.stubs.len();
        data.stubs.retain(|_, s| s.project_id != project_id);
        let removed = before - data.stubs.len();
        self.persist(&data)?;
        Ok(removed)
    }

    /// Record the remote identifier a WireMock server assigned to this
    /// stub's mapping, so later syncs of the same stub become updates.
    /// Does not bump the stub version.
    pub fn set_stub_remote_id(&self, id: Uuid, remote_id: &str) -> Result<(), StoreError> {
        let mut data = self.data.write();
        let stub = data.stubs.get_mut(&id).ok_or(StoreError::StubNotFound)?;
        stub.mapping.id = Some(remote_id.to_string());
        self.persist(&data)?;
        Ok(())
    }
}
