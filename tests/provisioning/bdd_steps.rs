//! BDD step definitions for the provisioning workflow.

use rigger::{Provisioner, ResourceKind};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{ProvisioningContext, RunResult};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a clean subscription")]
fn clean_subscription(provisioning_context: ProvisioningContext) -> ProvisioningContext {
    provisioning_context
}

#[given("availability set creation fails")]
fn availability_set_fails(provisioning_context: ProvisioningContext) -> ProvisioningContext {
    provisioning_context
        .cloud
        .fail_create(ResourceKind::AvailabilitySet);
    provisioning_context
}

#[when("I run create")]
fn run_create(provisioning_context: ProvisioningContext) -> Result<ProvisioningContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let provisioner = Provisioner::new(provisioning_context.cloud.clone());
    let blueprint = provisioning_context.blueprint.clone();
    let result =
        runtime.block_on(async move { provisioner.create_and_stop(&blueprint).await });

    let outcome = match result {
        Ok(deployment) => RunResult::Created(deployment),
        Err(err) => RunResult::Failure(err.to_string()),
    };
    Ok(ProvisioningContext {
        outcome: Some(outcome),
        ..provisioning_context
    })
}

#[when("I delete the resource group")]
fn delete_group(
    provisioning_context: ProvisioningContext,
) -> Result<ProvisioningContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let provisioner = Provisioner::new(provisioning_context.cloud.clone());
    let group = provisioning_context.blueprint.resource_group.clone();
    let result = runtime.block_on(async move { provisioner.delete_group(&group).await });

    let outcome = match result {
        Ok(()) => RunResult::Deleted,
        Err(err) => RunResult::Failure(err.to_string()),
    };
    Ok(ProvisioningContext {
        outcome: Some(outcome),
        ..provisioning_context
    })
}

#[then("the run succeeds")]
fn run_succeeds(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    match &provisioning_context.outcome {
        Some(RunResult::Created(_) | RunResult::Deleted) => Ok(()),
        Some(RunResult::Failure(message)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the run fails mentioning \"{text}\"")]
fn run_fails(provisioning_context: &ProvisioningContext, text: String) -> Result<(), StepError> {
    match &provisioning_context.outcome {
        Some(RunResult::Failure(message)) if message.contains(&text) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure mentioning {text}, got {other:?}"
        ))),
    }
}

#[then("every resource kind is created once in order")]
fn created_once_in_order(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let calls = provisioning_context.cloud.create_calls();
    if calls == ResourceKind::ALL.to_vec() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "unexpected creation calls: {calls:?}"
        )))
    }
}

#[then("only the resource group and availability set creations were attempted")]
fn only_first_two_attempted(provisioning_context: &ProvisioningContext) -> Result<(), StepError> {
    let calls = provisioning_context.cloud.create_calls();
    let expected = vec![ResourceKind::ResourceGroup, ResourceKind::AvailabilitySet];
    if calls == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {expected:?}, got {calls:?}"
        )))
    }
}

#[then("the virtual machine is powered off \"{count}\" times")]
fn powered_off_times(
    provisioning_context: &ProvisioningContext,
    count: usize,
) -> Result<(), StepError> {
    let machine = &provisioning_context.blueprint.virtual_machine;
    let calls = provisioning_context.cloud.power_off_calls();
    if calls.len() == count && calls.iter().all(|name| name == machine) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} power-off calls for {machine}, got {calls:?}"
        )))
    }
}

#[then("the last run created \"{count}\" resources")]
fn last_run_created(
    provisioning_context: &ProvisioningContext,
    count: usize,
) -> Result<(), StepError> {
    match &provisioning_context.outcome {
        Some(RunResult::Created(deployment)) if deployment.created.len() == count => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {count} creations in the last run, got {other:?}"
        ))),
    }
}

#[then("the subscription holds \"{count}\" resources")]
fn subscription_holds(
    provisioning_context: &ProvisioningContext,
    count: usize,
) -> Result<(), StepError> {
    let resources = provisioning_context.cloud.resources();
    if resources.len() == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} resources, got {resources:?}"
        )))
    }
}
