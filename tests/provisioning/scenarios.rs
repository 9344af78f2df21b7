//! BDD scenarios for the provisioning workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProvisioningContext, provisioning_context};

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Create against a clean subscription"
)]
fn scenario_create_clean(provisioning_context: ProvisioningContext) {
    let _ = provisioning_context;
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Re-running create reuses every resource"
)]
fn scenario_create_twice(provisioning_context: ProvisioningContext) {
    let _ = provisioning_context;
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "A failed availability set aborts the remaining steps"
)]
fn scenario_abort_on_failure(provisioning_context: ProvisioningContext) {
    let _ = provisioning_context;
}

#[scenario(
    path = "tests/features/provisioning.feature",
    name = "Teardown removes the whole deployment"
)]
fn scenario_teardown_then_recreate(provisioning_context: ProvisioningContext) {
    let _ = provisioning_context;
}
