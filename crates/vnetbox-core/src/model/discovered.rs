// ── Discovered topology ──
//
// Produced by a `Discovery` source, consumed read-only by the engine.
// Subnet device lists are filled in by enrichment before reconciliation.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::mac::MacAddress;

/// A cloud subscription (account) that owns networks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

impl Subscription {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Value stored in the prefix "subscription" custom field.
    pub fn label(&self) -> String {
        format!("{} - {}", self.display_name, self.id)
    }

    /// Deep link to the subscription overview in the management portal.
    pub fn console_url(&self) -> String {
        format!(
            "https://portal.azure.com/#@/subscription/{}/overview",
            self.id
        )
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.display_name, self.id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredNetwork {
    pub id: String,
    pub name: String,
    pub subscription: Subscription,
    pub region: String,
    #[serde(default)]
    pub resource_group: String,
    /// CIDR strings in discovery order. Parsed (and validated) by the engine.
    #[serde(default)]
    pub address_space: Vec<String>,
    #[serde(default)]
    pub subnets: Vec<DiscoveredSubnet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredSubnet {
    pub id: String,
    pub name: String,
    /// `None` for subnets defined only through multi-prefix lists.
    #[serde(default)]
    pub address_prefix: Option<String>,
    #[serde(default)]
    pub devices: Vec<DiscoveredDevice>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceKind {
    VirtualMachine,
    NetworkInterface,
}

impl DeviceKind {
    /// Label used when composing type and role names. Kept identical to the
    /// labels earlier sync tooling wrote, so existing records still match.
    pub fn label(self) -> &'static str {
        match self {
            Self::VirtualMachine => "Vm",
            Self::NetworkInterface => "Network_Interface",
        }
    }

    pub fn is_virtual_machine(self) -> bool {
        matches!(self, Self::VirtualMachine)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Cloud resource id; also stored on the inventory device as its
    /// identity marker.
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    #[serde(default)]
    pub private_ip: Option<IpAddr>,
    #[serde(default)]
    pub mac_address: Option<MacAddress>,
    pub region: String,
    #[serde(default)]
    pub resource_group: String,
}

/// Resource group segment of an ARM resource id
/// (`/subscriptions/{sub}/resourceGroups/{rg}/providers/...`).
pub fn resource_group_of(resource_id: &str) -> Option<&str> {
    let mut segments = resource_id.trim_start_matches('/').split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments.next().filter(|rg| !rg.is_empty());
        }
    }
    None
}
