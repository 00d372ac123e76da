// ── Inventory seam ──
//
// Everything the reconcilers need from the target system, expressed in
// domain types. `NetboxInventory` is the REST-backed implementation,
// `PlanningInventory` a read-through wrapper for dry runs.

mod convert;
mod netbox;
mod plan;

use std::collections::BTreeSet;

use async_trait::async_trait;
use ipnet::IpNet;
use strum::Display;

use crate::error::CoreError;
use crate::model::{MacAddress, ObjectRef, TargetAddress, TargetDevice, TargetInterface, TargetPrefix};

pub use netbox::NetboxInventory;
pub use plan::PlanningInventory;

/// Prefix custom field holding `"{subscription name} - {subscription id}"`.
pub const SUBSCRIPTION_FIELD: &str = "azure_subscription";
/// Prefix custom field holding the subscription's portal link.
pub const SUBSCRIPTION_URL_FIELD: &str = "azure_subscription_url";

/// Reference object kinds resolved by slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RefKind {
    Tag,
    Manufacturer,
    DeviceType,
    DeviceRole,
    Site,
}

/// Create payload for a reference object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSpec {
    Tag {
        name: String,
        slug: String,
        description: String,
    },
    Manufacturer {
        name: String,
        slug: String,
        description: String,
    },
    DeviceType {
        model: String,
        slug: String,
        manufacturer: u64,
        tags: BTreeSet<u64>,
    },
    DeviceRole {
        name: String,
        slug: String,
        vm_role: bool,
        tags: BTreeSet<u64>,
    },
    Site {
        name: String,
        slug: String,
        description: String,
        tags: BTreeSet<u64>,
    },
}

impl RefSpec {
    pub fn kind(&self) -> RefKind {
        match self {
            Self::Tag { .. } => RefKind::Tag,
            Self::Manufacturer { .. } => RefKind::Manufacturer,
            Self::DeviceType { .. } => RefKind::DeviceType,
            Self::DeviceRole { .. } => RefKind::DeviceRole,
            Self::Site { .. } => RefKind::Site,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Self::Tag { slug, .. }
            | Self::Manufacturer { slug, .. }
            | Self::DeviceType { slug, .. }
            | Self::DeviceRole { slug, .. }
            | Self::Site { slug, .. } => slug,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::DeviceType { model, .. } => model,
            Self::Tag { name, .. }
            | Self::Manufacturer { name, .. }
            | Self::DeviceRole { name, .. }
            | Self::Site { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFieldSpec {
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub description: String,
    /// Content types the field applies to, e.g. `ipam.prefix`.
    pub object_types: Vec<String>,
}

/// Desired state of a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixSpec {
    pub cidr: IpNet,
    pub status: String,
    pub description: String,
    pub tags: BTreeSet<u64>,
    pub parent: Option<u64>,
    pub subscription_label: Option<String>,
    pub subscription_url: Option<String>,
}

/// Field-level changes for an existing prefix; `None` leaves a field alone.
/// The parent link is set on create only: NetBox derives prefix hierarchy
/// from containment and never reports a stored parent back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixChanges {
    pub status: Option<String>,
    pub description: Option<String>,
    pub tags: Option<BTreeSet<u64>>,
    pub subscription_label: Option<String>,
    pub subscription_url: Option<String>,
}

impl PrefixChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the changed fields, for logging.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.status.is_some() {
            fields.push("status");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        if self.subscription_label.is_some() {
            fields.push("subscription");
        }
        if self.subscription_url.is_some() {
            fields.push("subscription_url");
        }
        fields
    }
}

impl TargetPrefix {
    /// The record as it reads after `changes` are applied.
    pub fn with_changes(&self, changes: &PrefixChanges) -> Self {
        let mut next = self.clone();
        if let Some(status) = &changes.status {
            next.status.clone_from(status);
        }
        if let Some(description) = &changes.description {
            next.description.clone_from(description);
        }
        if let Some(tags) = &changes.tags {
            next.tags.clone_from(tags);
        }
        if changes.subscription_label.is_some() {
            next.subscription_label.clone_from(&changes.subscription_label);
        }
        if changes.subscription_url.is_some() {
            next.subscription_url.clone_from(&changes.subscription_url);
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub name: String,
    pub device_type: u64,
    pub role: u64,
    pub site: u64,
    /// Cloud resource id, stored as the device's identity marker.
    pub external_id: String,
    pub tags: BTreeSet<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub device: u64,
    pub name: String,
    pub mac_address: Option<MacAddress>,
    pub tags: BTreeSet<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpec {
    pub address: IpNet,
    pub description: String,
    pub interface: u64,
    pub tags: BTreeSet<u64>,
}

/// Read and write access to the target inventory.
///
/// Lookups return `Ok(None)` / an empty list for "absent"; an `Err` from
/// a lookup is a failed read, which callers may treat as absent. Creates
/// that collide with an existing natural key return
/// [`CoreError::Conflict`].
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn find_ref(&self, kind: RefKind, slug: &str) -> Result<Option<ObjectRef>, CoreError>;
    async fn create_ref(&self, spec: &RefSpec) -> Result<ObjectRef, CoreError>;

    async fn find_custom_field(&self, name: &str) -> Result<Option<u64>, CoreError>;
    async fn create_custom_field(&self, spec: &CustomFieldSpec) -> Result<u64, CoreError>;

    /// Every prefix equal to `cidr`, across routing scopes.
    async fn find_prefixes(&self, cidr: &IpNet) -> Result<Vec<TargetPrefix>, CoreError>;
    async fn create_prefix(&self, spec: &PrefixSpec) -> Result<TargetPrefix, CoreError>;
    async fn update_prefix(
        &self,
        current: &TargetPrefix,
        changes: &PrefixChanges,
    ) -> Result<TargetPrefix, CoreError>;

    async fn find_device(&self, name: &str, site: u64) -> Result<Option<TargetDevice>, CoreError>;
    async fn create_device(&self, spec: &DeviceSpec) -> Result<TargetDevice, CoreError>;

    async fn find_interface(
        &self,
        device: u64,
        name: &str,
    ) -> Result<Option<TargetInterface>, CoreError>;
    async fn create_interface(&self, spec: &InterfaceSpec) -> Result<TargetInterface, CoreError>;

    /// Every address record equal to `address` (host mask included).
    async fn find_addresses(&self, address: &IpNet) -> Result<Vec<TargetAddress>, CoreError>;
    async fn create_address(&self, spec: &AddressSpec) -> Result<TargetAddress, CoreError>;
    async fn assign_address(
        &self,
        current: &TargetAddress,
        interface: u64,
    ) -> Result<TargetAddress, CoreError>;
    /// Detach an address record from whatever it is assigned to.
    async fn unassign_address(&self, current: &TargetAddress) -> Result<TargetAddress, CoreError>;
}
