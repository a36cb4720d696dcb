//! Management hub for WireMock instances.
//!
//! Stubs live in the hub's own store, grouped into projects; each project
//! owns a set of remote WireMock instances. The hub pushes stubs to
//! instances, fires test requests at them, and turns recorded traffic back
//! into stubs.

pub mod api;
pub mod config;
pub mod importer;
pub mod mapping;
pub mod store;
pub mod sync;
pub mod tester;
pub mod transfer;
pub mod wiremock;
