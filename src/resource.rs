//! Resource identities and the desired-state requests used to create them.

use std::fmt;

use thiserror::Error;

/// Kinds of cloud resource managed by the provisioner.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ResourceKind {
    /// Region-scoped container that owns every other resource.
    ResourceGroup,
    /// Placement group spreading machines across failure domains.
    AvailabilitySet,
    /// Internet-facing address attached to the network interface.
    PublicIpAddress,
    /// Virtual network with a single subnet.
    VirtualNetwork,
    /// Network interface joining the subnet and carrying the public IP.
    NetworkInterface,
    /// The virtual machine itself.
    VirtualMachine,
}

impl ResourceKind {
    /// Every kind, in provisioning order.
    pub const ALL: [Self; 6] = [
        Self::ResourceGroup,
        Self::AvailabilitySet,
        Self::PublicIpAddress,
        Self::VirtualNetwork,
        Self::NetworkInterface,
        Self::VirtualMachine,
    ];

    /// Phrase used in progress messages, for example `a virtual network`.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ResourceGroup => "a resource group",
            Self::AvailabilitySet => "an availability set",
            Self::PublicIpAddress => "a public IP address",
            Self::VirtualNetwork => "a virtual network",
            Self::NetworkInterface => "a network interface",
            Self::VirtualMachine => "a virtual machine",
        }
    }

    /// Kinds that a request of this kind must reference.
    #[must_use]
    pub const fn required_dependencies(self) -> &'static [Self] {
        match self {
            Self::NetworkInterface => &[Self::PublicIpAddress, Self::VirtualNetwork],
            Self::VirtualMachine => &[Self::NetworkInterface, Self::AvailabilitySet],
            Self::ResourceGroup
            | Self::AvailabilitySet
            | Self::PublicIpAddress
            | Self::VirtualNetwork => &[],
        }
    }

    /// Returns `true` for kinds that live inside a resource group.
    #[must_use]
    pub const fn is_group_scoped(self) -> bool {
        !matches!(self, Self::ResourceGroup)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ResourceGroup => "ResourceGroup",
            Self::AvailabilitySet => "AvailabilitySet",
            Self::PublicIpAddress => "PublicIPAddress",
            Self::VirtualNetwork => "VirtualNetwork",
            Self::NetworkInterface => "NetworkInterface",
            Self::VirtualMachine => "VirtualMachine",
        };
        f.write_str(label)
    }
}

/// Reference to a provisioned cloud object.
///
/// Handles are produced by the cloud client, either from a listing or from a
/// successful creation, and are never mutated afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceHandle {
    /// Kind of the referenced resource.
    pub kind: ResourceKind,
    /// Name, unique within the kind's collection for the account.
    pub name: String,
    /// Provider identifier used when other resources reference this one.
    pub id: String,
    /// Region the resource lives in.
    pub region: String,
}

/// Anything that can be looked up by its exact name.
pub trait Named {
    /// The name compared during lookups.
    fn name(&self) -> &str;
}

impl Named for ResourceHandle {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Named + ?Sized> Named for &T {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Returns the first item whose name equals `name` exactly.
///
/// The comparison is case-sensitive and never matches substrings, so `myVM2`
/// and `myvm` are both distinct from `myVM`.
pub fn find_by_name<I>(items: I, name: &str) -> Option<I::Item>
where
    I: IntoIterator,
    I::Item: Named,
{
    items.into_iter().find(|item| item.name() == name)
}

/// Availability set SKU.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AvailabilitySetSku {
    /// Required for machines with managed disks.
    Aligned,
    /// Legacy SKU for unmanaged disks.
    Classic,
}

impl AvailabilitySetSku {
    /// Provider spelling of the SKU.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aligned => "Aligned",
            Self::Classic => "Classic",
        }
    }
}

/// IP address allocation method.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IpAllocation {
    /// Address assigned when the owning resource starts.
    Dynamic,
    /// Address reserved at creation time.
    Static,
}

impl IpAllocation {
    /// Provider spelling of the allocation method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dynamic => "Dynamic",
            Self::Static => "Static",
        }
    }
}

/// Subnet declared inside a virtual network.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubnetSpec {
    /// Subnet name, referenced again by the network interface.
    pub name: String,
    /// CIDR prefix, for example `10.0.0.0/24`.
    pub address_prefix: String,
}

/// Marketplace image reference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageReference {
    /// Image publisher, for example `MicrosoftWindowsServer`.
    pub publisher: String,
    /// Offer, for example `WindowsServer`.
    pub offer: String,
    /// SKU, for example `2019-Datacenter`.
    pub sku: String,
    /// Version, usually `latest`.
    pub version: String,
}

/// Options for a virtual machine.
#[derive(Clone, Eq, PartialEq)]
pub struct VirtualMachineSettings {
    /// Boot image.
    pub image: ImageReference,
    /// Size name, for example `Standard_DS1_v2`.
    pub size: String,
    /// Administrator account name.
    pub admin_username: String,
    /// Administrator password. Redacted from `Debug` output.
    pub admin_password: String,
    /// Guest host name.
    pub computer_name: String,
}

impl fmt::Debug for VirtualMachineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualMachineSettings")
            .field("image", &self.image)
            .field("size", &self.size)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &"<redacted>")
            .field("computer_name", &self.computer_name)
            .finish()
    }
}

/// Kind-specific options for a provisioning request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResourceSettings {
    /// A resource group has no options beyond name and region.
    ResourceGroup,
    /// Availability set options.
    AvailabilitySet {
        /// SKU of the set.
        sku: AvailabilitySetSku,
        /// Number of fault domains.
        fault_domains: u32,
        /// Number of update domains.
        update_domains: u32,
    },
    /// Public IP options.
    PublicIpAddress {
        /// Allocation method.
        allocation: IpAllocation,
    },
    /// Virtual network options.
    VirtualNetwork {
        /// Address space in CIDR notation.
        address_space: String,
        /// The single subnet created with the network.
        subnet: SubnetSpec,
    },
    /// Network interface options.
    NetworkInterface {
        /// Subnet of the referenced network to join.
        subnet_name: String,
        /// Allocation method for the primary private address.
        private_ip_allocation: IpAllocation,
    },
    /// Virtual machine options.
    VirtualMachine(VirtualMachineSettings),
}

impl ResourceSettings {
    /// Kind of resource these settings describe.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::ResourceGroup => ResourceKind::ResourceGroup,
            Self::AvailabilitySet { .. } => ResourceKind::AvailabilitySet,
            Self::PublicIpAddress { .. } => ResourceKind::PublicIpAddress,
            Self::VirtualNetwork { .. } => ResourceKind::VirtualNetwork,
            Self::NetworkInterface { .. } => ResourceKind::NetworkInterface,
            Self::VirtualMachine(_) => ResourceKind::VirtualMachine,
        }
    }

    fn validate(&self) -> Result<(), RequestError> {
        match self {
            Self::ResourceGroup | Self::PublicIpAddress { .. } => Ok(()),
            Self::AvailabilitySet {
                fault_domains,
                update_domains,
                ..
            } => {
                if *fault_domains == 0 {
                    return Err(RequestError::Validation(String::from("fault_domains")));
                }
                if *update_domains == 0 {
                    return Err(RequestError::Validation(String::from("update_domains")));
                }
                Ok(())
            }
            Self::VirtualNetwork {
                address_space,
                subnet,
            } => require_all(&[
                ("address_space", address_space),
                ("subnet.name", &subnet.name),
                ("subnet.address_prefix", &subnet.address_prefix),
            ]),
            Self::NetworkInterface { subnet_name, .. } => {
                require_all(&[("subnet_name", subnet_name)])
            }
            Self::VirtualMachine(vm) => require_all(&[
                ("image.publisher", &vm.image.publisher),
                ("image.offer", &vm.image.offer),
                ("image.sku", &vm.image.sku),
                ("image.version", &vm.image.version),
                ("size", &vm.size),
                ("admin_username", &vm.admin_username),
                ("admin_password", &vm.admin_password),
                ("computer_name", &vm.computer_name),
            ]),
        }
    }
}

fn require_all(fields: &[(&str, &String)]) -> Result<(), RequestError> {
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(RequestError::Validation((*field).to_owned()));
        }
    }
    Ok(())
}

/// Errors raised when a provisioning request is incomplete.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a required field is missing or blank.
    #[error("missing or empty field: {0}")]
    Validation(String),
    /// Raised when a required dependency handle was not supplied.
    #[error("{kind} request is missing its {dependency} dependency")]
    MissingDependency {
        /// Kind being requested.
        kind: ResourceKind,
        /// Kind of the absent dependency.
        dependency: ResourceKind,
    },
}

/// Desired state for a single resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProvisioningRequest {
    /// Name of the resource.
    pub name: String,
    /// Target region, for example `eastus`.
    pub region: String,
    /// Enclosing resource group. `None` only for resource groups.
    pub parent_group: Option<String>,
    /// Already-provisioned resources this one references.
    pub dependencies: Vec<ResourceHandle>,
    /// Kind-specific options.
    pub settings: ResourceSettings,
}

impl ProvisioningRequest {
    /// Starts a builder for a request with the given settings.
    #[must_use]
    pub fn builder(settings: ResourceSettings) -> ProvisioningRequestBuilder {
        ProvisioningRequestBuilder::new(settings)
    }

    /// Kind of resource requested.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.settings.kind()
    }

    /// Returns the dependency of the given kind, if supplied.
    #[must_use]
    pub fn dependency(&self, kind: ResourceKind) -> Option<&ResourceHandle> {
        self.dependencies.iter().find(|handle| handle.kind == kind)
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when a required field is blank and
    /// [`RequestError::MissingDependency`] when a dependency the kind needs
    /// was not supplied.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.name.is_empty() {
            return Err(RequestError::Validation(String::from("name")));
        }
        if self.region.is_empty() {
            return Err(RequestError::Validation(String::from("region")));
        }
        let kind = self.kind();
        if kind.is_group_scoped() && self.parent_group.as_deref().is_none_or(str::is_empty) {
            return Err(RequestError::Validation(String::from("parent_group")));
        }
        self.settings.validate()?;
        for dependency in kind.required_dependencies() {
            if self.dependency(*dependency).is_none() {
                return Err(RequestError::MissingDependency {
                    kind,
                    dependency: *dependency,
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`ProvisioningRequest`] that trims and validates on build.
#[derive(Clone, Debug)]
pub struct ProvisioningRequestBuilder {
    name: String,
    region: String,
    parent_group: Option<String>,
    dependencies: Vec<ResourceHandle>,
    settings: ResourceSettings,
}

impl ProvisioningRequestBuilder {
    /// Creates a builder; name and region must be set before build.
    #[must_use]
    pub const fn new(settings: ResourceSettings) -> Self {
        Self {
            name: String::new(),
            region: String::new(),
            parent_group: None,
            dependencies: Vec::new(),
            settings,
        }
    }

    /// Sets the resource name.
    #[must_use]
    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = value.into();
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn region(mut self, value: impl Into<String>) -> Self {
        self.region = value.into();
        self
    }

    /// Sets the enclosing resource group.
    #[must_use]
    pub fn parent_group(mut self, value: impl Into<String>) -> Self {
        self.parent_group = Some(value.into());
        self
    }

    /// Adds a dependency handle.
    #[must_use]
    pub fn dependency(mut self, handle: ResourceHandle) -> Self {
        self.dependencies.push(handle);
        self
    }

    /// Builds and validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when validation fails.
    pub fn build(self) -> Result<ProvisioningRequest, RequestError> {
        let request = ProvisioningRequest {
            name: self.name.trim().to_owned(),
            region: self.region.trim().to_owned(),
            parent_group: self.parent_group.map(|group| group.trim().to_owned()),
            dependencies: self.dependencies,
            settings: self.settings,
        };
        request.validate()?;
        Ok(request)
    }
}
