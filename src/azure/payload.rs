//! Request bodies sent with Resource Manager `PUT` calls.

use serde::Serialize;
use serde_json::{Value, json};

use crate::resource::{ProvisioningRequest, ResourceHandle, ResourceKind, ResourceSettings};

use super::AzureClientError;

#[derive(Debug, Serialize)]
pub(super) struct ResourceBody {
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sku: Option<Sku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Sku {
    name: String,
}

/// Builds the `PUT` body for a request.
///
/// Dependencies are referenced by their Resource Manager ids.
///
/// # Errors
///
/// Returns [`AzureClientError::MissingDependency`] when a dependency the body
/// must reference was not supplied.
pub(super) fn body_for(request: &ProvisioningRequest) -> Result<ResourceBody, AzureClientError> {
    let location = request.region.clone();
    let body = match &request.settings {
        ResourceSettings::ResourceGroup => ResourceBody {
            location,
            sku: None,
            properties: None,
        },
        ResourceSettings::AvailabilitySet {
            sku,
            fault_domains,
            update_domains,
        } => ResourceBody {
            location,
            sku: Some(Sku {
                name: sku.as_str().to_owned(),
            }),
            properties: Some(json!({
                "platformFaultDomainCount": fault_domains,
                "platformUpdateDomainCount": update_domains,
            })),
        },
        ResourceSettings::PublicIpAddress { allocation } => ResourceBody {
            location,
            sku: None,
            properties: Some(json!({
                "publicIPAllocationMethod": allocation.as_str(),
            })),
        },
        ResourceSettings::VirtualNetwork {
            address_space,
            subnet,
        } => ResourceBody {
            location,
            sku: None,
            properties: Some(json!({
                "addressSpace": { "addressPrefixes": [address_space] },
                "subnets": [{
                    "name": subnet.name,
                    "properties": { "addressPrefix": subnet.address_prefix },
                }],
            })),
        },
        ResourceSettings::NetworkInterface {
            subnet_name,
            private_ip_allocation,
        } => {
            let network = required(request, ResourceKind::VirtualNetwork)?;
            let public_ip = required(request, ResourceKind::PublicIpAddress)?;
            ResourceBody {
                location,
                sku: None,
                properties: Some(json!({
                    "ipConfigurations": [{
                        "name": "primary",
                        "properties": {
                            "primary": true,
                            "subnet": { "id": format!("{}/subnets/{subnet_name}", network.id) },
                            "privateIPAllocationMethod": private_ip_allocation.as_str(),
                            "publicIPAddress": { "id": public_ip.id },
                        },
                    }],
                })),
            }
        }
        ResourceSettings::VirtualMachine(machine) => {
            let nic = required(request, ResourceKind::NetworkInterface)?;
            let availability_set = required(request, ResourceKind::AvailabilitySet)?;
            ResourceBody {
                location,
                sku: None,
                properties: Some(json!({
                    "hardwareProfile": { "vmSize": machine.size },
                    "storageProfile": {
                        "imageReference": {
                            "publisher": machine.image.publisher,
                            "offer": machine.image.offer,
                            "sku": machine.image.sku,
                            "version": machine.image.version,
                        },
                        "osDisk": { "createOption": "FromImage" },
                    },
                    "osProfile": {
                        "computerName": machine.computer_name,
                        "adminUsername": machine.admin_username,
                        "adminPassword": machine.admin_password,
                    },
                    "networkProfile": {
                        "networkInterfaces": [{
                            "id": nic.id,
                            "properties": { "primary": true },
                        }],
                    },
                    "availabilitySet": { "id": availability_set.id },
                })),
            }
        }
    };
    Ok(body)
}

fn required(
    request: &ProvisioningRequest,
    dependency: ResourceKind,
) -> Result<&ResourceHandle, AzureClientError> {
    request
        .dependency(dependency)
        .ok_or_else(|| AzureClientError::MissingDependency {
            kind: request.kind(),
            name: request.name.clone(),
            dependency,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{
        AvailabilitySetSku, ImageReference, IpAllocation, SubnetSpec, VirtualMachineSettings,
    };

    fn handle(kind: ResourceKind, id: &str) -> ResourceHandle {
        ResourceHandle {
            kind,
            name: String::from("dep"),
            id: id.to_owned(),
            region: String::from("eastus"),
        }
    }

    fn unchecked(settings: ResourceSettings, dependencies: Vec<ResourceHandle>) -> ProvisioningRequest {
        ProvisioningRequest {
            name: String::from("res"),
            region: String::from("eastus"),
            parent_group: Some(String::from("rg")),
            dependencies,
            settings,
        }
    }

    fn to_json(body: &ResourceBody) -> Value {
        serde_json::to_value(body).expect("body serialises")
    }

    #[test]
    fn resource_group_body_is_location_only() {
        let body = body_for(&unchecked(ResourceSettings::ResourceGroup, vec![])).expect("body");
        assert_eq!(to_json(&body), json!({ "location": "eastus" }));
    }

    #[test]
    fn availability_set_body_carries_sku_and_domains() {
        let body = body_for(&unchecked(
            ResourceSettings::AvailabilitySet {
                sku: AvailabilitySetSku::Aligned,
                fault_domains: 2,
                update_domains: 5,
            },
            vec![],
        ))
        .expect("body");
        assert_eq!(
            to_json(&body),
            json!({
                "location": "eastus",
                "sku": { "name": "Aligned" },
                "properties": {
                    "platformFaultDomainCount": 2,
                    "platformUpdateDomainCount": 5,
                },
            })
        );
    }

    #[test]
    fn virtual_network_body_declares_subnet() {
        let body = body_for(&unchecked(
            ResourceSettings::VirtualNetwork {
                address_space: String::from("10.0.0.0/16"),
                subnet: SubnetSpec {
                    name: String::from("mySubnet"),
                    address_prefix: String::from("10.0.0.0/24"),
                },
            },
            vec![],
        ))
        .expect("body");
        let json = to_json(&body);
        assert_eq!(
            json["properties"]["addressSpace"]["addressPrefixes"],
            json!(["10.0.0.0/16"])
        );
        assert_eq!(json["properties"]["subnets"][0]["name"], "mySubnet");
    }

    #[test]
    fn network_interface_body_references_dependencies_by_id() {
        let body = body_for(&unchecked(
            ResourceSettings::NetworkInterface {
                subnet_name: String::from("mySubnet"),
                private_ip_allocation: IpAllocation::Dynamic,
            },
            vec![
                handle(ResourceKind::PublicIpAddress, "/ip"),
                handle(ResourceKind::VirtualNetwork, "/vnet"),
            ],
        ))
        .expect("body");
        let config = &to_json(&body)["properties"]["ipConfigurations"][0]["properties"];
        assert_eq!(config["subnet"]["id"], "/vnet/subnets/mySubnet");
        assert_eq!(config["publicIPAddress"]["id"], "/ip");
        assert_eq!(config["privateIPAllocationMethod"], "Dynamic");
    }

    #[test]
    fn virtual_machine_body_requires_availability_set() {
        let machine = VirtualMachineSettings {
            image: ImageReference {
                publisher: String::from("MicrosoftWindowsServer"),
                offer: String::from("WindowsServer"),
                sku: String::from("2019-Datacenter"),
                version: String::from("latest"),
            },
            size: String::from("Standard_DS1_v2"),
            admin_username: String::from("azureuser"),
            admin_password: String::from("pw"),
            computer_name: String::from("myVM"),
        };
        let err = body_for(&unchecked(
            ResourceSettings::VirtualMachine(machine),
            vec![handle(ResourceKind::NetworkInterface, "/nic")],
        ))
        .expect_err("availability set is missing");
        assert!(matches!(
            err,
            AzureClientError::MissingDependency {
                dependency: ResourceKind::AvailabilitySet,
                ..
            }
        ));
    }
}
