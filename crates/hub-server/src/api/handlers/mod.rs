//! Request handlers, one module per resource.

pub mod instances;
pub mod projects;
pub mod stubs;
pub mod system;
