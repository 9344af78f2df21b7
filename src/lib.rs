//! Core library for the Rigger provisioning tool.
//!
//! The crate exposes a cloud client abstraction, an idempotent provisioner
//! that get-or-creates a fixed six-resource Azure deployment, and an Azure
//! Resource Manager implementation of the client (resource group → network →
//! virtual machine → power off).

pub mod azure;
pub mod backend;
pub mod blueprint;
pub mod config;
pub mod provisioner;
pub mod resource;
pub mod test_support;

pub use azure::{AzureClient, AzureClientError, AzureCredentials, CredentialsError};
pub use backend::{BackendFuture, CloudClient};
pub use blueprint::Blueprint;
pub use config::{AzureConfig, ConfigError, DeploymentConfig};
pub use provisioner::{Deployment, ProvisionError, Provisioned, Provisioner};
pub use resource::{
    Named, ProvisioningRequest, ProvisioningRequestBuilder, RequestError, ResourceHandle,
    ResourceKind, ResourceSettings, find_by_name,
};
