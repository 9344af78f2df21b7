//! Polling helpers for long-running Resource Manager operations.

use std::time::Instant;

use tokio::time::sleep;

use crate::resource::{ResourceHandle, ResourceKind};

use super::arm::{ArmResource, InstanceView};
use super::{AzureClient, AzureClientError};

impl AzureClient {
    /// `None` when the timeout is too large to represent, meaning no deadline.
    fn deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(self.operation_timeout)
    }

    /// Polls a resource until its provisioning state is terminal.
    pub(super) async fn wait_for_provisioning(
        &self,
        kind: ResourceKind,
        name: &str,
        url: &str,
    ) -> Result<ArmResource, AzureClientError> {
        let deadline = self.deadline();
        while within(deadline) {
            sleep(self.poll_interval).await;
            let resource: ArmResource = self.get_json(url).await?;
            match resource.provisioning_state() {
                Some(state) if state.is_failed() => {
                    return Err(AzureClientError::ProvisioningFailed {
                        kind,
                        name: name.to_owned(),
                        state: state.as_str().to_owned(),
                    });
                }
                Some(state) if !state.is_succeeded() => {
                    tracing::debug!(%kind, resource = name, state = state.as_str(), "still provisioning");
                }
                _ => return Ok(resource),
            }
        }

        Err(AzureClientError::Timeout {
            action: format!("{kind} provisioning"),
            name: name.to_owned(),
        })
    }

    /// Polls the instance view until the machine reports a stopped power state.
    pub(super) async fn wait_until_stopped(
        &self,
        machine: &ResourceHandle,
    ) -> Result<(), AzureClientError> {
        let url = self
            .paths
            .action_url(&machine.id, "instanceView", ResourceKind::VirtualMachine);
        let deadline = self.deadline();
        while within(deadline) {
            let view: InstanceView = self.get_json(&url).await?;
            if view.power_state().is_some_and(|state| state.is_stopped()) {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }

        Err(AzureClientError::Timeout {
            action: String::from("power off"),
            name: machine.name.clone(),
        })
    }
}

fn within(deadline: Option<Instant>) -> bool {
    deadline.is_none_or(|limit| Instant::now() <= limit)
}
