//! Client side of the WireMock admin API.
//!
//! Every remote instance is treated as a black box behind
//! `{base}/__admin/...`: mappings CRUD, bulk reset and the request journal.
//! Connection failures, timeouts and non-2xx admin responses all surface as
//! [`WireMockError`] values; nothing here retries.

mod client;
mod types;

pub use client::{WireMockClient, WireMockError};
pub use types::{normalize_unmatched, LoggedRequest, RequestDetails, ResponseDetails};
