//! Cloud client abstraction consumed by the provisioner.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{ProvisioningRequest, ResourceHandle, ResourceKind};

/// Future returned by cloud client operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface implemented by cloud control-plane clients.
///
/// Creation and power-off resolve once the provider has finished the
/// operation. Group deletion resolves once the provider has accepted it.
pub trait CloudClient {
    /// Provider specific error type returned by the client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists every resource of `kind` visible to the current credentials.
    fn list(&self, kind: ResourceKind) -> BackendFuture<'_, Vec<ResourceHandle>, Self::Error>;

    /// Creates the requested resource and returns its handle.
    fn create<'a>(
        &'a self,
        request: &'a ProvisioningRequest,
    ) -> BackendFuture<'a, ResourceHandle, Self::Error>;

    /// Powers off a virtual machine, resolving once it has stopped.
    fn power_off<'a>(&'a self, machine: &'a ResourceHandle) -> BackendFuture<'a, (), Self::Error>;

    /// Deletes a resource group and, through the provider, everything in it.
    ///
    /// Completion of the cascade is not awaited.
    fn delete_group<'a>(&'a self, name: &'a str) -> BackendFuture<'a, (), Self::Error>;
}
