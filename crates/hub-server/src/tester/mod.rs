//! Stub testing: derive a concrete request from a mapping and fire it at
//! every active instance of the stub's project.

mod builder;
mod runner;

pub use builder::{build_test_request, BuildRequestError, TestOverrides, TestRequest};
pub use runner::{InstanceTestResult, StubTestError, StubTestReport, StubTester, TestSummary};
