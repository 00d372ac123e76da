// ── Inventory-side records ──
//
// Only the fields the reconcilers compare or link on. Conversion from the
// REST payloads lives in `inventory::convert`.

use std::collections::BTreeSet;

use ipnet::IpNet;
use serde::Serialize;

use super::mac::MacAddress;

/// A lookup-or-create reference object (tag, manufacturer, device type,
/// device role, site), keyed by slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetPrefix {
    pub id: u64,
    pub cidr: IpNet,
    /// Routing scope; `None` is the global table.
    pub vrf: Option<u64>,
    pub status: String,
    pub description: String,
    pub tags: BTreeSet<u64>,
    pub parent: Option<u64>,
    pub subscription_label: Option<String>,
    pub subscription_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDevice {
    pub id: u64,
    pub name: String,
    pub site: u64,
    /// Cloud resource id recorded when the device was created, if any.
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetInterface {
    pub id: u64,
    pub device: u64,
    pub name: String,
    pub mac_address: Option<MacAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetAddress {
    pub id: u64,
    pub address: IpNet,
    /// Interface holding the live assignment.
    pub interface: Option<u64>,
}
