// ── Dry-run inventory ──
//
// Reads go to the wrapped inventory; writes are logged and answered with
// synthetic records so the rest of the pipeline runs unchanged. Synthetic
// ids start at `PLANNED_ID_BASE`; lookups keyed on one are answered
// locally since the real inventory cannot know them.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use ipnet::IpNet;
use tracing::info;

use super::{
    AddressSpec, CustomFieldSpec, DeviceSpec, Inventory, InterfaceSpec, PrefixChanges,
    PrefixSpec, RefKind, RefSpec,
};
use crate::error::CoreError;
use crate::model::{ObjectRef, TargetAddress, TargetDevice, TargetInterface, TargetPrefix};

pub const PLANNED_ID_BASE: u64 = 1 << 48;

/// Read-through, write-nothing wrapper used by `plan` and `--dry-run`.
pub struct PlanningInventory<I> {
    inner: I,
    next_id: AtomicU64,
}

impl<I: Inventory> PlanningInventory<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            next_id: AtomicU64::new(PLANNED_ID_BASE),
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    fn allocate(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_planned(id: u64) -> bool {
        id >= PLANNED_ID_BASE
    }
}

#[async_trait]
impl<I: Inventory> Inventory for PlanningInventory<I> {
    async fn find_ref(&self, kind: RefKind, slug: &str) -> Result<Option<ObjectRef>, CoreError> {
        self.inner.find_ref(kind, slug).await
    }

    async fn create_ref(&self, spec: &RefSpec) -> Result<ObjectRef, CoreError> {
        info!(kind = %spec.kind(), slug = spec.slug(), "dry run: would create");
        Ok(ObjectRef {
            id: self.allocate(),
            name: spec.name().to_owned(),
            slug: spec.slug().to_owned(),
        })
    }

    async fn find_custom_field(&self, name: &str) -> Result<Option<u64>, CoreError> {
        self.inner.find_custom_field(name).await
    }

    async fn create_custom_field(&self, spec: &CustomFieldSpec) -> Result<u64, CoreError> {
        info!(name = %spec.name, "dry run: would create custom field");
        Ok(self.allocate())
    }

    async fn find_prefixes(&self, cidr: &IpNet) -> Result<Vec<TargetPrefix>, CoreError> {
        self.inner.find_prefixes(cidr).await
    }

    async fn create_prefix(&self, spec: &PrefixSpec) -> Result<TargetPrefix, CoreError> {
        info!(cidr = %spec.cidr, "dry run: would create prefix");
        Ok(TargetPrefix {
            id: self.allocate(),
            cidr: spec.cidr,
            vrf: None,
            status: spec.status.clone(),
            description: spec.description.clone(),
            tags: spec.tags.clone(),
            parent: spec.parent,
            subscription_label: spec.subscription_label.clone(),
            subscription_url: spec.subscription_url.clone(),
        })
    }

    async fn update_prefix(
        &self,
        current: &TargetPrefix,
        changes: &PrefixChanges,
    ) -> Result<TargetPrefix, CoreError> {
        info!(cidr = %current.cidr, fields = ?changes.fields(), "dry run: would update prefix");
        Ok(current.with_changes(changes))
    }

    async fn find_device(&self, name: &str, site: u64) -> Result<Option<TargetDevice>, CoreError> {
        if Self::is_planned(site) {
            return Ok(None);
        }
        self.inner.find_device(name, site).await
    }

    async fn create_device(&self, spec: &DeviceSpec) -> Result<TargetDevice, CoreError> {
        info!(device = %spec.name, site = spec.site, "dry run: would create device");
        Ok(TargetDevice {
            id: self.allocate(),
            name: spec.name.clone(),
            site: spec.site,
            external_id: Some(spec.external_id.clone()),
        })
    }

    async fn find_interface(
        &self,
        device: u64,
        name: &str,
    ) -> Result<Option<TargetInterface>, CoreError> {
        if Self::is_planned(device) {
            return Ok(None);
        }
        self.inner.find_interface(device, name).await
    }

    async fn create_interface(&self, spec: &InterfaceSpec) -> Result<TargetInterface, CoreError> {
        info!(interface = %spec.name, device = spec.device, "dry run: would create interface");
        Ok(TargetInterface {
            id: self.allocate(),
            device: spec.device,
            name: spec.name.clone(),
            mac_address: spec.mac_address.clone(),
        })
    }

    async fn find_addresses(&self, address: &IpNet) -> Result<Vec<TargetAddress>, CoreError> {
        self.inner.find_addresses(address).await
    }

    async fn create_address(&self, spec: &AddressSpec) -> Result<TargetAddress, CoreError> {
        info!(address = %spec.address, "dry run: would create IP address");
        Ok(TargetAddress {
            id: self.allocate(),
            address: spec.address,
            interface: Some(spec.interface),
        })
    }

    async fn assign_address(
        &self,
        current: &TargetAddress,
        interface: u64,
    ) -> Result<TargetAddress, CoreError> {
        info!(address = %current.address, interface, "dry run: would reassign IP address");
        Ok(TargetAddress {
            interface: Some(interface),
            ..current.clone()
        })
    }

    async fn unassign_address(&self, current: &TargetAddress) -> Result<TargetAddress, CoreError> {
        info!(address = %current.address, id = current.id, "dry run: would detach duplicate IP address");
        Ok(TargetAddress {
            interface: None,
            ..current.clone()
        })
    }
}
