//! Shared fixtures for provisioning BDD scenarios.

use rigger::test_support::RecordingCloud;
use rigger::{Blueprint, Deployment};
use rstest::fixture;

pub const ADMIN_PASSWORD: &str = "Sup3r-secret!";

#[derive(Clone, Debug)]
pub struct ProvisioningContext {
    pub cloud: RecordingCloud,
    pub blueprint: Blueprint,
    pub outcome: Option<RunResult>,
}

#[derive(Clone, Debug)]
pub enum RunResult {
    Created(Deployment),
    Deleted,
    Failure(String),
}

#[fixture]
pub fn provisioning_context() -> ProvisioningContext {
    ProvisioningContext {
        cloud: RecordingCloud::new(),
        blueprint: Blueprint::with_defaults(ADMIN_PASSWORD),
        outcome: None,
    }
}
