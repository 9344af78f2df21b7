//! Resource Manager paths, API versions and response shapes.

use serde::Deserialize;

use crate::resource::{ProvisioningRequest, ResourceHandle, ResourceKind};

use super::AzureClientError;
use super::types::{PowerState, ProvisioningState};

const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";
const COMPUTE_API_VERSION: &str = "2023-09-01";
const NETWORK_API_VERSION: &str = "2023-09-01";

/// Provider namespace and type segment for group-scoped kinds.
const fn provider_type(kind: ResourceKind) -> Option<&'static str> {
    match kind {
        ResourceKind::ResourceGroup => None,
        ResourceKind::AvailabilitySet => Some("Microsoft.Compute/availabilitySets"),
        ResourceKind::PublicIpAddress => Some("Microsoft.Network/publicIPAddresses"),
        ResourceKind::VirtualNetwork => Some("Microsoft.Network/virtualNetworks"),
        ResourceKind::NetworkInterface => Some("Microsoft.Network/networkInterfaces"),
        ResourceKind::VirtualMachine => Some("Microsoft.Compute/virtualMachines"),
    }
}

const fn api_version(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::ResourceGroup => RESOURCE_GROUP_API_VERSION,
        ResourceKind::AvailabilitySet | ResourceKind::VirtualMachine => COMPUTE_API_VERSION,
        ResourceKind::PublicIpAddress
        | ResourceKind::VirtualNetwork
        | ResourceKind::NetworkInterface => NETWORK_API_VERSION,
    }
}

/// Builds Resource Manager URLs for one subscription.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ArmPaths {
    base: String,
    subscription_id: String,
}

impl ArmPaths {
    pub(super) fn new(resource_manager_url: &str, subscription_id: &str) -> Self {
        Self {
            base: resource_manager_url.trim_end_matches('/').to_owned(),
            subscription_id: subscription_id.to_owned(),
        }
    }

    pub(super) fn group_id(&self, group: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{group}",
            self.subscription_id
        )
    }

    /// Resource id the request will be created under.
    pub(super) fn request_id(&self, request: &ProvisioningRequest) -> String {
        match provider_type(request.kind()) {
            None => self.group_id(&request.name),
            Some(segment) => format!(
                "{}/providers/{segment}/{}",
                self.group_id(request.parent_group.as_deref().unwrap_or_default()),
                request.name
            ),
        }
    }

    /// Subscription-wide listing URL for a kind.
    pub(super) fn list_url(&self, kind: ResourceKind) -> String {
        let version = api_version(kind);
        match provider_type(kind) {
            None => format!(
                "{}/subscriptions/{}/resourcegroups?api-version={version}",
                self.base, self.subscription_id
            ),
            Some(segment) => format!(
                "{}/subscriptions/{}/providers/{segment}?api-version={version}",
                self.base, self.subscription_id
            ),
        }
    }

    pub(super) fn resource_url(&self, id: &str, kind: ResourceKind) -> String {
        format!("{}{id}?api-version={}", self.base, api_version(kind))
    }

    pub(super) fn action_url(&self, id: &str, action: &str, kind: ResourceKind) -> String {
        format!("{}{id}/{action}?api-version={}", self.base, api_version(kind))
    }
}

/// One page of a Resource Manager listing.
#[derive(Debug, Deserialize)]
pub(super) struct ListPage {
    #[serde(default)]
    pub(super) value: Vec<ArmResource>,
    #[serde(rename = "nextLink", default)]
    pub(super) next_link: Option<String>,
}

/// Common envelope shared by every resource type.
#[derive(Debug, Deserialize)]
pub(super) struct ArmResource {
    pub(super) id: String,
    pub(super) name: String,
    #[serde(default)]
    pub(super) location: String,
    #[serde(default)]
    pub(super) properties: Option<ArmProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ArmProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

impl ArmResource {
    pub(super) fn provisioning_state(&self) -> Option<ProvisioningState> {
        self.properties
            .as_ref()
            .and_then(|props| props.provisioning_state.clone())
            .map(ProvisioningState::from)
    }

    pub(super) fn into_handle(self, kind: ResourceKind) -> ResourceHandle {
        ResourceHandle {
            kind,
            name: self.name,
            id: self.id,
            region: self.location,
        }
    }
}

/// Subset of a virtual machine instance view.
#[derive(Debug, Deserialize)]
pub(super) struct InstanceView {
    #[serde(default)]
    statuses: Vec<InstanceStatus>,
}

#[derive(Debug, Deserialize)]
struct InstanceStatus {
    #[serde(default)]
    code: String,
}

impl InstanceView {
    pub(super) fn power_state(&self) -> Option<PowerState> {
        self.statuses
            .iter()
            .find_map(|status| PowerState::from_status_code(&status.code))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Converts a failed response into an [`AzureClientError::Api`].
pub(super) fn api_error(status: u16, body: &[u8]) -> AzureClientError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => AzureClientError::Api {
            status,
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => AzureClientError::Api {
            status,
            code: String::from("Unknown"),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}
