//! Idempotent get-or-create orchestration.
//!
//! The provisioner walks the deployment in a fixed order: resource group,
//! availability set, public IP, virtual network, network interface and
//! virtual machine. Each step looks the resource up by exact name first and
//! only issues a creation call when nothing matches. The first failure aborts
//! the run; resources created before it are left in place so the next run
//! resumes where this one stopped.

use thiserror::Error;

use crate::backend::CloudClient;
use crate::blueprint::Blueprint;
use crate::resource::{
    ProvisioningRequest, RequestError, ResourceHandle, ResourceKind, find_by_name,
};

/// Errors surfaced while provisioning or tearing down a deployment.
#[derive(Debug, Error)]
pub enum ProvisionError<ClientError>
where
    ClientError: std::error::Error + 'static,
{
    /// Raised when a step's request cannot be built.
    #[error("invalid provisioning request: {0}")]
    Request(#[from] RequestError),
    /// Raised when listing existing resources fails.
    #[error("failed to look up {kind} {name}")]
    Lookup {
        /// Kind being searched for.
        kind: ResourceKind,
        /// Name being searched for.
        name: String,
        /// Provider-specific error.
        #[source]
        source: ClientError,
    },
    /// Raised when the creation call fails.
    #[error("failed to create {kind} {name}")]
    Create {
        /// Kind being created.
        kind: ResourceKind,
        /// Name being created.
        name: String,
        /// Provider-specific error.
        #[source]
        source: ClientError,
    },
    /// Raised when the virtual machine cannot be powered off.
    #[error("failed to power off virtual machine {name}")]
    PowerOff {
        /// Machine name.
        name: String,
        /// Provider-specific error.
        #[source]
        source: ClientError,
    },
    /// Raised when deleting the resource group fails.
    #[error("failed to delete resource group {group}")]
    Teardown {
        /// Group name.
        group: String,
        /// Provider-specific error.
        #[source]
        source: ClientError,
    },
}

/// Outcome of a get-or-create step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Provisioned {
    /// A resource with the requested name already existed and was reused.
    Existing(ResourceHandle),
    /// No match was found, so the resource was created.
    Created(ResourceHandle),
}

impl Provisioned {
    /// Returns the handle regardless of which branch produced it.
    #[must_use]
    pub fn into_handle(self) -> ResourceHandle {
        match self {
            Self::Existing(handle) | Self::Created(handle) => handle,
        }
    }

    /// Borrows the handle.
    #[must_use]
    pub const fn handle(&self) -> &ResourceHandle {
        match self {
            Self::Existing(handle) | Self::Created(handle) => handle,
        }
    }

    /// Returns `true` when this step issued a creation call.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Handles for every resource of a provisioned deployment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deployment {
    /// The resource group.
    pub resource_group: ResourceHandle,
    /// The availability set.
    pub availability_set: ResourceHandle,
    /// The public IP address.
    pub public_ip: ResourceHandle,
    /// The virtual network.
    pub virtual_network: ResourceHandle,
    /// The network interface.
    pub network_interface: ResourceHandle,
    /// The virtual machine.
    pub virtual_machine: ResourceHandle,
    /// Kinds created during this run, in creation order.
    pub created: Vec<ResourceKind>,
}

/// Drives a cloud client through the deployment.
#[derive(Debug)]
pub struct Provisioner<C> {
    client: C,
}

impl<C> Provisioner<C>
where
    C: CloudClient,
{
    /// Creates a provisioner around an already-authenticated client.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// Borrows the underlying client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Looks for a resource of `kind` named exactly `name`.
    ///
    /// An empty or non-matching listing yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Lookup`] when the listing call fails.
    pub async fn find_existing(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Option<ResourceHandle>, ProvisionError<C::Error>> {
        let items = self
            .client
            .list(kind)
            .await
            .map_err(|source| ProvisionError::Lookup {
                kind,
                name: name.to_owned(),
                source,
            })?;
        Ok(find_by_name(items, name))
    }

    /// Returns the existing resource for the request or creates it.
    ///
    /// Existing resources are returned as found; their properties are not
    /// compared with the request.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Lookup`] or [`ProvisionError::Create`] when
    /// the corresponding client call fails.
    pub async fn get_or_create(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<Provisioned, ProvisionError<C::Error>> {
        let kind = request.kind();
        tracing::info!(%kind, name = %request.name, "searching for {}", kind.display_name());
        if let Some(existing) = self.find_existing(kind, &request.name).await? {
            tracing::info!(%kind, name = %existing.name, "reusing {}", kind.display_name());
            return Ok(Provisioned::Existing(existing));
        }

        tracing::info!(%kind, name = %request.name, "creating {}", kind.display_name());
        let created = self
            .client
            .create(request)
            .await
            .map_err(|source| ProvisionError::Create {
                kind,
                name: request.name.clone(),
                source,
            })?;
        Ok(Provisioned::Created(created))
    }

    /// Ensures every resource of the blueprint exists, in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProvisionError`]; later steps are not attempted.
    pub async fn provision(
        &self,
        blueprint: &Blueprint,
    ) -> Result<Deployment, ProvisionError<C::Error>> {
        let mut created = Vec::new();
        let resource_group = self
            .step(blueprint.resource_group_request()?, &mut created)
            .await?;
        let availability_set = self
            .step(blueprint.availability_set_request()?, &mut created)
            .await?;
        let public_ip = self
            .step(blueprint.public_ip_request()?, &mut created)
            .await?;
        let virtual_network = self
            .step(blueprint.virtual_network_request()?, &mut created)
            .await?;
        let network_interface = self
            .step(
                blueprint.network_interface_request(&public_ip, &virtual_network)?,
                &mut created,
            )
            .await?;
        let virtual_machine = self
            .step(
                blueprint.virtual_machine_request(&network_interface, &availability_set)?,
                &mut created,
            )
            .await?;

        Ok(Deployment {
            resource_group,
            availability_set,
            public_ip,
            virtual_network,
            network_interface,
            virtual_machine,
            created,
        })
    }

    async fn step(
        &self,
        request: ProvisioningRequest,
        created: &mut Vec<ResourceKind>,
    ) -> Result<ResourceHandle, ProvisionError<C::Error>> {
        let outcome = self.get_or_create(&request).await?;
        if outcome.was_created() {
            created.push(request.kind());
        }
        Ok(outcome.into_handle())
    }

    /// Powers off a virtual machine and waits for it to stop.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::PowerOff`] when the client call fails.
    pub async fn power_off(
        &self,
        machine: &ResourceHandle,
    ) -> Result<(), ProvisionError<C::Error>> {
        tracing::info!(name = %machine.name, "stopping a virtual machine");
        self.client
            .power_off(machine)
            .await
            .map_err(|source| ProvisionError::PowerOff {
                name: machine.name.clone(),
                source,
            })
    }

    /// Provisions the blueprint and then powers off its virtual machine.
    ///
    /// The power-off is issued on every run, including runs where every
    /// resource already existed.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProvisionError`] raised by provisioning or
    /// power-off.
    pub async fn create_and_stop(
        &self,
        blueprint: &Blueprint,
    ) -> Result<Deployment, ProvisionError<C::Error>> {
        let deployment = self.provision(blueprint).await?;
        self.power_off(&deployment.virtual_machine).await?;
        Ok(deployment)
    }

    /// Deletes a resource group and everything inside it.
    ///
    /// Returns as soon as the provider accepts the request.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Teardown`] when the client call fails.
    pub async fn delete_group(&self, group: &str) -> Result<(), ProvisionError<C::Error>> {
        tracing::info!(group, "deleting resource group");
        self.client
            .delete_group(group)
            .await
            .map_err(|source| ProvisionError::Teardown {
                group: group.to_owned(),
                source,
            })
    }
}
