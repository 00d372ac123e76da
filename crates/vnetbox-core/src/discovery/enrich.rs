// ── Device enrichment ──
//
// Attaches discovered NICs to the subnets they sit in. A NIC bound to a
// VM becomes a virtual-machine device named after the VM; a free NIC
// becomes a network-interface device named after itself.

use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::discovered::resource_group_of;
use crate::model::{DeviceKind, DiscoveredDevice, DiscoveredNetwork, MacAddress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpConfiguration {
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default)]
    pub private_ip_address: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub mac_address: Option<MacAddress>,
    /// Id of the VM the NIC is attached to, if any.
    #[serde(default)]
    pub virtual_machine_id: Option<String>,
    #[serde(default)]
    pub ip_configurations: Vec<IpConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
}

/// Fill each subnet's device list from `nics`. Resource ids compare
/// case-insensitively.
pub fn attach_devices(
    networks: &mut [DiscoveredNetwork],
    nics: &[NetworkInterface],
    vms: &[VirtualMachine],
) {
    let vm_names: HashMap<String, &VirtualMachine> =
        vms.iter().map(|vm| (vm.id.to_lowercase(), vm)).collect();

    let mut slots: HashMap<String, (usize, usize)> = HashMap::new();
    for (n, network) in networks.iter().enumerate() {
        for (s, subnet) in network.subnets.iter().enumerate() {
            slots.insert(subnet.id.to_lowercase(), (n, s));
        }
    }

    for nic in nics {
        let vm = nic
            .virtual_machine_id
            .as_deref()
            .and_then(|id| vm_names.get(&id.to_lowercase()));

        for config in &nic.ip_configurations {
            let Some(subnet_id) = config.subnet_id.as_deref() else {
                continue;
            };
            let Some(&(n, s)) = slots.get(&subnet_id.to_lowercase()) else {
                continue;
            };
            let Some(subnet) = networks.get_mut(n).and_then(|net| net.subnets.get_mut(s)) else {
                continue;
            };

            let (id, name, kind) = match vm {
                Some(vm) => (vm.id.clone(), vm.name.clone(), DeviceKind::VirtualMachine),
                None => (nic.id.clone(), nic.name.clone(), DeviceKind::NetworkInterface),
            };
            debug!(device = %name, subnet = %subnet.name, "attached device");
            subnet.devices.push(DiscoveredDevice {
                resource_group: resource_group_of(&id).unwrap_or_default().to_owned(),
                id,
                name,
                kind,
                private_ip: config.private_ip_address,
                mac_address: nic.mac_address.clone(),
                region: nic.location.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiscoveredSubnet, Subscription};
    use pretty_assertions::assert_eq;

    const SUBNET: &str = "/subscriptions/s1/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/hub/subnets/app";

    fn networks() -> Vec<DiscoveredNetwork> {
        vec![DiscoveredNetwork {
            id: "/subscriptions/s1/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/hub".into(),
            name: "hub".into(),
            subscription: Subscription::new("s1", "contoso-dev"),
            region: "westeurope".into(),
            resource_group: "rg-net".into(),
            address_space: vec!["10.0.0.0/16".into()],
            subnets: vec![DiscoveredSubnet {
                id: SUBNET.into(),
                name: "app".into(),
                address_prefix: Some("10.0.1.0/24".into()),
                devices: Vec::new(),
            }],
        }]
    }

    #[test]
    fn vm_and_free_nic_attach_to_subnet() {
        let vm_id = "/subscriptions/s1/resourceGroups/rg-app/providers/Microsoft.Compute/virtualMachines/web01";
        let nics = vec![
            NetworkInterface {
                id: "/subscriptions/s1/resourceGroups/rg-app/providers/Microsoft.Network/networkInterfaces/web01-nic".into(),
                name: "web01-nic".into(),
                location: "westeurope".into(),
                mac_address: Some(MacAddress::new("00-0D-3A-00-00-01")),
                virtual_machine_id: Some(vm_id.to_uppercase()),
                ip_configurations: vec![IpConfiguration {
                    subnet_id: Some(SUBNET.to_uppercase()),
                    private_ip_address: "10.0.1.5".parse().ok(),
                }],
            },
            NetworkInterface {
                id: "/subscriptions/s1/resourceGroups/rg-pe/providers/Microsoft.Network/networkInterfaces/pe-nic".into(),
                name: "pe-nic".into(),
                location: "westeurope".into(),
                mac_address: None,
                virtual_machine_id: None,
                ip_configurations: vec![IpConfiguration {
                    subnet_id: Some(SUBNET.into()),
                    private_ip_address: "10.0.1.6".parse().ok(),
                }],
            },
            NetworkInterface {
                id: "elsewhere".into(),
                name: "elsewhere".into(),
                location: "eastus".into(),
                mac_address: None,
                virtual_machine_id: None,
                ip_configurations: vec![IpConfiguration {
                    subnet_id: Some("/other/subnet".into()),
                    private_ip_address: None,
                }],
            },
        ];
        let vms = vec![VirtualMachine {
            id: vm_id.into(),
            name: "web01".into(),
        }];

        let mut nets = networks();
        attach_devices(&mut nets, &nics, &vms);

        let devices = &nets[0].subnets[0].devices;
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "web01");
        assert_eq!(devices[0].kind, DeviceKind::VirtualMachine);
        assert_eq!(devices[0].resource_group, "rg-app");
        assert_eq!(devices[1].name, "pe-nic");
        assert_eq!(devices[1].kind, DeviceKind::NetworkInterface);
        assert_eq!(devices[1].resource_group, "rg-pe");
    }
}
