//! Provenance tagging for outbound mappings.
//!
//! Mappings pushed to a WireMock server are stamped with the owning hub
//! project so they can be traced back from the remote side. The injection
//! happens on a copy right before the push and is never written back into
//! the local stub record.

use crate::mapping::Mapping;
use crate::store::Project;
use serde_json::Value;

pub const METADATA_PROJECT_ID: &str = "hub_project_id";
pub const METADATA_PROJECT_NAME: &str = "hub_project_name";

/// Return a copy of `mapping` whose metadata carries the owning project's
/// id and name. Pre-existing metadata keys survive; the two hub keys win
/// on collision. The input is never mutated.
pub fn inject_hub_metadata(mapping: &Mapping, project: &Project) -> Mapping {
    let mut out = mapping.clone();
    let mut metadata = out.metadata.take().unwrap_or_default();
    metadata.insert(
        METADATA_PROJECT_ID.to_string(),
        Value::String(project.id.to_string()),
    );
    metadata.insert(
        METADATA_PROJECT_NAME.to_string(),
        Value::String(project.name.clone()),
    );
    out.metadata = Some(metadata);
    out
}
