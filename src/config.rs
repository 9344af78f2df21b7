//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::blueprint::{
    Blueprint, DEFAULT_ADDRESS_SPACE, DEFAULT_ADMIN_USERNAME, DEFAULT_AVAILABILITY_SET,
    DEFAULT_IMAGE_OFFER, DEFAULT_IMAGE_PUBLISHER, DEFAULT_IMAGE_SKU, DEFAULT_IMAGE_VERSION,
    DEFAULT_NETWORK_INTERFACE, DEFAULT_PUBLIC_IP, DEFAULT_REGION, DEFAULT_RESOURCE_GROUP,
    DEFAULT_SUBNET_NAME, DEFAULT_SUBNET_PREFIX, DEFAULT_VIRTUAL_MACHINE, DEFAULT_VIRTUAL_NETWORK,
    DEFAULT_VM_SIZE,
};
use crate::resource::{ImageReference, SubnetSpec};

const APP_NAME: &str = "rigger";

/// Azure connection settings derived from environment variables and
/// configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "AZURE")]
pub struct AzureConfig {
    /// Path to the service principal credentials file. Required.
    pub auth_location: Option<String>,
    /// Seconds between status polls of long-running operations.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Seconds a long-running operation may take before giving up.
    #[ortho_config(default = 900)]
    pub operation_timeout_secs: u64,
}

/// Names, region, image and credentials for the deployment.
#[derive(Clone, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "RIGGER",
    discovery(
        app_name = "rigger",
        env_var = "RIGGER_CONFIG_PATH",
        config_file_name = "rigger.toml",
        dotfile_name = ".rigger.toml",
        project_file_name = "rigger.toml"
    )
)]
pub struct DeploymentConfig {
    /// Resource group that owns every resource.
    #[ortho_config(default = DEFAULT_RESOURCE_GROUP.to_owned())]
    pub resource_group: String,
    /// Region for every resource.
    #[ortho_config(default = DEFAULT_REGION.to_owned())]
    pub region: String,
    /// Availability set name.
    #[ortho_config(default = DEFAULT_AVAILABILITY_SET.to_owned())]
    pub availability_set: String,
    /// Public IP name.
    #[ortho_config(default = DEFAULT_PUBLIC_IP.to_owned())]
    pub public_ip: String,
    /// Virtual network name.
    #[ortho_config(default = DEFAULT_VIRTUAL_NETWORK.to_owned())]
    pub virtual_network: String,
    /// Virtual network address space.
    #[ortho_config(default = DEFAULT_ADDRESS_SPACE.to_owned())]
    pub address_space: String,
    /// Subnet name.
    #[ortho_config(default = DEFAULT_SUBNET_NAME.to_owned())]
    pub subnet_name: String,
    /// Subnet address prefix.
    #[ortho_config(default = DEFAULT_SUBNET_PREFIX.to_owned())]
    pub subnet_prefix: String,
    /// Network interface name.
    #[ortho_config(default = DEFAULT_NETWORK_INTERFACE.to_owned())]
    pub network_interface: String,
    /// Virtual machine name.
    #[ortho_config(default = DEFAULT_VIRTUAL_MACHINE.to_owned())]
    pub virtual_machine: String,
    /// Image publisher.
    #[ortho_config(default = DEFAULT_IMAGE_PUBLISHER.to_owned())]
    pub image_publisher: String,
    /// Image offer.
    #[ortho_config(default = DEFAULT_IMAGE_OFFER.to_owned())]
    pub image_offer: String,
    /// Image SKU.
    #[ortho_config(default = DEFAULT_IMAGE_SKU.to_owned())]
    pub image_sku: String,
    /// Image version.
    #[ortho_config(default = DEFAULT_IMAGE_VERSION.to_owned())]
    pub image_version: String,
    /// Machine size.
    #[ortho_config(default = DEFAULT_VM_SIZE.to_owned())]
    pub vm_size: String,
    /// Administrator account.
    #[ortho_config(default = DEFAULT_ADMIN_USERNAME.to_owned())]
    pub admin_username: String,
    /// Administrator password. Required; there is no default.
    pub admin_password: Option<String>,
}

impl std::fmt::Debug for DeploymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentConfig")
            .field("resource_group", &self.resource_group)
            .field("region", &self.region)
            .field("virtual_machine", &self.virtual_machine)
            .field("vm_size", &self.vm_size)
            .field("admin_username", &self.admin_username)
            .finish_non_exhaustive()
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

fn require_field(value: Option<&str>, metadata: &FieldMetadata) -> Result<(), ConfigError> {
    if value.is_none_or(|text| text.trim().is_empty()) {
        return Err(ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to {APP_NAME}.toml",
            metadata.description, metadata.env_var, metadata.toml_key
        )));
    }
    Ok(())
}

impl AzureConfig {
    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from(APP_NAME)])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks that the credentials location is set and the durations are
    /// usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Parse`] when a duration is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_field(
            self.auth_location.as_deref(),
            &FieldMetadata::new(
                "credentials file location",
                "AZURE_AUTH_LOCATION",
                "auth_location",
            ),
        )?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Parse(String::from(
                "poll_interval_secs must be greater than zero",
            )));
        }
        if self.operation_timeout_secs == 0 {
            return Err(ConfigError::Parse(String::from(
                "operation_timeout_secs must be greater than zero",
            )));
        }
        Ok(())
    }

    /// Returns the validated credentials file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn credentials_path(&self) -> Result<Utf8PathBuf, ConfigError> {
        self.validate()?;
        Ok(Utf8PathBuf::from(
            self.auth_location.as_deref().unwrap_or_default().trim(),
        ))
    }

    /// Interval between status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Upper bound on a long-running operation.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl DeploymentConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from(APP_NAME)])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields: [(Option<&str>, FieldMetadata); 17] = [
            (
                Some(self.resource_group.as_str()),
                FieldMetadata::new("resource group", "RIGGER_RESOURCE_GROUP", "resource_group"),
            ),
            (
                Some(self.region.as_str()),
                FieldMetadata::new("region", "RIGGER_REGION", "region"),
            ),
            (
                Some(self.availability_set.as_str()),
                FieldMetadata::new(
                    "availability set name",
                    "RIGGER_AVAILABILITY_SET",
                    "availability_set",
                ),
            ),
            (
                Some(self.public_ip.as_str()),
                FieldMetadata::new("public IP name", "RIGGER_PUBLIC_IP", "public_ip"),
            ),
            (
                Some(self.virtual_network.as_str()),
                FieldMetadata::new(
                    "virtual network name",
                    "RIGGER_VIRTUAL_NETWORK",
                    "virtual_network",
                ),
            ),
            (
                Some(self.address_space.as_str()),
                FieldMetadata::new("address space", "RIGGER_ADDRESS_SPACE", "address_space"),
            ),
            (
                Some(self.subnet_name.as_str()),
                FieldMetadata::new("subnet name", "RIGGER_SUBNET_NAME", "subnet_name"),
            ),
            (
                Some(self.subnet_prefix.as_str()),
                FieldMetadata::new("subnet prefix", "RIGGER_SUBNET_PREFIX", "subnet_prefix"),
            ),
            (
                Some(self.network_interface.as_str()),
                FieldMetadata::new(
                    "network interface name",
                    "RIGGER_NETWORK_INTERFACE",
                    "network_interface",
                ),
            ),
            (
                Some(self.virtual_machine.as_str()),
                FieldMetadata::new(
                    "virtual machine name",
                    "RIGGER_VIRTUAL_MACHINE",
                    "virtual_machine",
                ),
            ),
            (
                Some(self.image_publisher.as_str()),
                FieldMetadata::new("image publisher", "RIGGER_IMAGE_PUBLISHER", "image_publisher"),
            ),
            (
                Some(self.image_offer.as_str()),
                FieldMetadata::new("image offer", "RIGGER_IMAGE_OFFER", "image_offer"),
            ),
            (
                Some(self.image_sku.as_str()),
                FieldMetadata::new("image SKU", "RIGGER_IMAGE_SKU", "image_sku"),
            ),
            (
                Some(self.image_version.as_str()),
                FieldMetadata::new("image version", "RIGGER_IMAGE_VERSION", "image_version"),
            ),
            (
                Some(self.vm_size.as_str()),
                FieldMetadata::new("VM size", "RIGGER_VM_SIZE", "vm_size"),
            ),
            (
                Some(self.admin_username.as_str()),
                FieldMetadata::new(
                    "administrator username",
                    "RIGGER_ADMIN_USERNAME",
                    "admin_username",
                ),
            ),
            (
                self.admin_password.as_deref(),
                FieldMetadata::new(
                    "administrator password",
                    "RIGGER_ADMIN_PASSWORD",
                    "admin_password",
                ),
            ),
        ];
        for (value, metadata) in &fields {
            require_field(*value, metadata)?;
        }
        Ok(())
    }

    /// Returns the resource group to delete. Only the group name is required
    /// for teardown.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the group name is blank.
    pub fn teardown_group(&self) -> Result<&str, ConfigError> {
        require_field(
            Some(self.resource_group.as_str()),
            &FieldMetadata::new("resource group", "RIGGER_RESOURCE_GROUP", "resource_group"),
        )?;
        Ok(self.resource_group.trim())
    }

    /// Builds the deployment [`Blueprint`] from the configured values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn as_blueprint(&self) -> Result<Blueprint, ConfigError> {
        self.validate()?;
        let password = self.admin_password.clone().unwrap_or_default();
        let mut blueprint = Blueprint::with_defaults(password);
        blueprint.resource_group = trimmed(&self.resource_group);
        blueprint.region = trimmed(&self.region);
        blueprint.availability_set = trimmed(&self.availability_set);
        blueprint.public_ip = trimmed(&self.public_ip);
        blueprint.virtual_network = trimmed(&self.virtual_network);
        blueprint.address_space = trimmed(&self.address_space);
        blueprint.subnet = SubnetSpec {
            name: trimmed(&self.subnet_name),
            address_prefix: trimmed(&self.subnet_prefix),
        };
        blueprint.network_interface = trimmed(&self.network_interface);
        blueprint.virtual_machine = trimmed(&self.virtual_machine);
        blueprint.image = ImageReference {
            publisher: trimmed(&self.image_publisher),
            offer: trimmed(&self.image_offer),
            sku: trimmed(&self.image_sku),
            version: trimmed(&self.image_version),
        };
        blueprint.vm_size = trimmed(&self.vm_size);
        blueprint.admin_username = trimmed(&self.admin_username);
        Ok(blueprint)
    }
}

/// Surrounding whitespace from env vars and TOML never reaches a request.
fn trimmed(value: &str) -> String {
    value.trim().to_owned()
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
