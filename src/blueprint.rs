//! The fixed six-resource deployment and the requests that build it.
//!
//! Each request constructor takes the handles it depends on, so a network
//! interface request cannot exist before its public IP and virtual network
//! have been resolved.

use std::fmt;

use crate::resource::{
    AvailabilitySetSku, ImageReference, IpAllocation, ProvisioningRequest,
    ProvisioningRequestBuilder, RequestError, ResourceHandle, ResourceSettings, SubnetSpec,
    VirtualMachineSettings,
};

/// Default resource group name.
pub const DEFAULT_RESOURCE_GROUP: &str = "azure203ResourceGroup";
/// Default region.
pub const DEFAULT_REGION: &str = "eastus";
/// Default availability set name.
pub const DEFAULT_AVAILABILITY_SET: &str = "myAvSet";
/// Default public IP name.
pub const DEFAULT_PUBLIC_IP: &str = "myPublicIP";
/// Default virtual network name.
pub const DEFAULT_VIRTUAL_NETWORK: &str = "myVNet";
/// Default virtual network address space.
pub const DEFAULT_ADDRESS_SPACE: &str = "10.0.0.0/16";
/// Default subnet name.
pub const DEFAULT_SUBNET_NAME: &str = "mySubnet";
/// Default subnet prefix.
pub const DEFAULT_SUBNET_PREFIX: &str = "10.0.0.0/24";
/// Default network interface name.
pub const DEFAULT_NETWORK_INTERFACE: &str = "myNIC";
/// Default virtual machine name.
pub const DEFAULT_VIRTUAL_MACHINE: &str = "myVM";
/// Default image publisher.
pub const DEFAULT_IMAGE_PUBLISHER: &str = "MicrosoftWindowsServer";
/// Default image offer.
pub const DEFAULT_IMAGE_OFFER: &str = "WindowsServer";
/// Default image SKU.
pub const DEFAULT_IMAGE_SKU: &str = "2019-Datacenter";
/// Default image version.
pub const DEFAULT_IMAGE_VERSION: &str = "latest";
/// Default machine size.
pub const DEFAULT_VM_SIZE: &str = "Standard_DS1_v2";
/// Default administrator account.
pub const DEFAULT_ADMIN_USERNAME: &str = "azureuser";

const DEFAULT_FAULT_DOMAINS: u32 = 2;
const DEFAULT_UPDATE_DOMAINS: u32 = 5;

/// Names, region and settings for every step of the deployment.
#[derive(Clone, Eq, PartialEq)]
pub struct Blueprint {
    /// Resource group that owns everything else.
    pub resource_group: String,
    /// Region shared by every resource.
    pub region: String,
    /// Availability set name.
    pub availability_set: String,
    /// Availability set SKU.
    pub availability_set_sku: AvailabilitySetSku,
    /// Fault domains of the availability set.
    pub fault_domains: u32,
    /// Update domains of the availability set.
    pub update_domains: u32,
    /// Public IP name.
    pub public_ip: String,
    /// Public IP allocation method.
    pub public_ip_allocation: IpAllocation,
    /// Virtual network name.
    pub virtual_network: String,
    /// Virtual network address space.
    pub address_space: String,
    /// Subnet created inside the virtual network.
    pub subnet: SubnetSpec,
    /// Network interface name.
    pub network_interface: String,
    /// Virtual machine name, also used as its computer name.
    pub virtual_machine: String,
    /// Boot image.
    pub image: ImageReference,
    /// Machine size.
    pub vm_size: String,
    /// Administrator account.
    pub admin_username: String,
    admin_password: String,
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("resource_group", &self.resource_group)
            .field("region", &self.region)
            .field("availability_set", &self.availability_set)
            .field("public_ip", &self.public_ip)
            .field("virtual_network", &self.virtual_network)
            .field("network_interface", &self.network_interface)
            .field("virtual_machine", &self.virtual_machine)
            .field("image", &self.image)
            .field("vm_size", &self.vm_size)
            .field("admin_username", &self.admin_username)
            .finish_non_exhaustive()
    }
}

impl Blueprint {
    /// Returns the stock deployment with the given administrator password.
    #[must_use]
    pub fn with_defaults(admin_password: impl Into<String>) -> Self {
        Self {
            resource_group: DEFAULT_RESOURCE_GROUP.to_owned(),
            region: DEFAULT_REGION.to_owned(),
            availability_set: DEFAULT_AVAILABILITY_SET.to_owned(),
            availability_set_sku: AvailabilitySetSku::Aligned,
            fault_domains: DEFAULT_FAULT_DOMAINS,
            update_domains: DEFAULT_UPDATE_DOMAINS,
            public_ip: DEFAULT_PUBLIC_IP.to_owned(),
            public_ip_allocation: IpAllocation::Dynamic,
            virtual_network: DEFAULT_VIRTUAL_NETWORK.to_owned(),
            address_space: DEFAULT_ADDRESS_SPACE.to_owned(),
            subnet: SubnetSpec {
                name: DEFAULT_SUBNET_NAME.to_owned(),
                address_prefix: DEFAULT_SUBNET_PREFIX.to_owned(),
            },
            network_interface: DEFAULT_NETWORK_INTERFACE.to_owned(),
            virtual_machine: DEFAULT_VIRTUAL_MACHINE.to_owned(),
            image: ImageReference {
                publisher: DEFAULT_IMAGE_PUBLISHER.to_owned(),
                offer: DEFAULT_IMAGE_OFFER.to_owned(),
                sku: DEFAULT_IMAGE_SKU.to_owned(),
                version: DEFAULT_IMAGE_VERSION.to_owned(),
            },
            vm_size: DEFAULT_VM_SIZE.to_owned(),
            admin_username: DEFAULT_ADMIN_USERNAME.to_owned(),
            admin_password: admin_password.into(),
        }
    }

    /// Replaces the administrator password.
    #[must_use]
    pub fn admin_password(mut self, value: impl Into<String>) -> Self {
        self.admin_password = value.into();
        self
    }

    fn scoped(&self, name: &str, settings: ResourceSettings) -> ProvisioningRequestBuilder {
        ProvisioningRequest::builder(settings)
            .name(name)
            .region(&self.region)
            .parent_group(&self.resource_group)
    }

    /// Step 1: the resource group.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the group name or region is blank.
    pub fn resource_group_request(&self) -> Result<ProvisioningRequest, RequestError> {
        ProvisioningRequest::builder(ResourceSettings::ResourceGroup)
            .name(&self.resource_group)
            .region(&self.region)
            .build()
    }

    /// Step 2: the availability set.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when a field is blank or a domain count is
    /// zero.
    pub fn availability_set_request(&self) -> Result<ProvisioningRequest, RequestError> {
        self.scoped(
            &self.availability_set,
            ResourceSettings::AvailabilitySet {
                sku: self.availability_set_sku,
                fault_domains: self.fault_domains,
                update_domains: self.update_domains,
            },
        )
        .build()
    }

    /// Step 3: the public IP address.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when a field is blank.
    pub fn public_ip_request(&self) -> Result<ProvisioningRequest, RequestError> {
        self.scoped(
            &self.public_ip,
            ResourceSettings::PublicIpAddress {
                allocation: self.public_ip_allocation,
            },
        )
        .build()
    }

    /// Step 4: the virtual network and its subnet.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when a field is blank.
    pub fn virtual_network_request(&self) -> Result<ProvisioningRequest, RequestError> {
        self.scoped(
            &self.virtual_network,
            ResourceSettings::VirtualNetwork {
                address_space: self.address_space.clone(),
                subnet: self.subnet.clone(),
            },
        )
        .build()
    }

    /// Step 5: the network interface joining the subnet with the public IP.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when a field is blank.
    pub fn network_interface_request(
        &self,
        public_ip: &ResourceHandle,
        network: &ResourceHandle,
    ) -> Result<ProvisioningRequest, RequestError> {
        self.scoped(
            &self.network_interface,
            ResourceSettings::NetworkInterface {
                subnet_name: self.subnet.name.clone(),
                private_ip_allocation: IpAllocation::Dynamic,
            },
        )
        .dependency(public_ip.clone())
        .dependency(network.clone())
        .build()
    }

    /// Step 6: the virtual machine.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when a field is blank, including an empty
    /// administrator password.
    pub fn virtual_machine_request(
        &self,
        network_interface: &ResourceHandle,
        availability_set: &ResourceHandle,
    ) -> Result<ProvisioningRequest, RequestError> {
        self.scoped(
            &self.virtual_machine,
            ResourceSettings::VirtualMachine(VirtualMachineSettings {
                image: self.image.clone(),
                size: self.vm_size.clone(),
                admin_username: self.admin_username.clone(),
                admin_password: self.admin_password.clone(),
                computer_name: self.virtual_machine.clone(),
            }),
        )
        .dependency(network_interface.clone())
        .dependency(availability_set.clone())
        .build()
    }
}
