// In-memory `Inventory` for unit tests. Enforces the same natural-key
// uniqueness NetBox does, so conflict paths are exercised for real.
#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use ipnet::IpNet;

use crate::error::CoreError;
use crate::inventory::{
    AddressSpec, CustomFieldSpec, DeviceSpec, Inventory, InterfaceSpec, PrefixChanges,
    PrefixSpec, RefKind, RefSpec,
};
use crate::model::{ObjectRef, TargetAddress, TargetDevice, TargetInterface, TargetPrefix};

#[derive(Default)]
struct State {
    next_id: u64,
    refs: BTreeMap<(RefKind, String), ObjectRef>,
    custom_fields: BTreeMap<String, u64>,
    custom_field_specs: Vec<CustomFieldSpec>,
    prefixes: Vec<TargetPrefix>,
    devices: Vec<TargetDevice>,
    interfaces: Vec<TargetInterface>,
    addresses: Vec<TargetAddress>,
    /// Write operations in call order, e.g. `create_prefix 10.0.0.0/16`.
    journal: Vec<String>,
    failing_ref_lookups: usize,
    failing_prefix_lookups: usize,
    failing_custom_field_creates: usize,
    /// Errors handed out by the next device lookups, in order.
    device_lookup_errors: VecDeque<CoreError>,
}

impl State {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn conflict(what: impl std::fmt::Display) -> CoreError {
    CoreError::Conflict {
        message: format!("{what} already exists"),
    }
}

fn lookup_failure(entity: &str, key: &str) -> CoreError {
    CoreError::Lookup {
        entity: entity.into(),
        key: key.into(),
        message: "503 Service Unavailable".into(),
    }
}

#[derive(Default)]
pub struct MemoryInventory {
    state: Mutex<State>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ──────────────────────────────────────────────────────

    pub fn seed_ref(&self, kind: RefKind, slug: &str, name: &str) -> ObjectRef {
        let mut state = self.state.lock().unwrap();
        let r = ObjectRef {
            id: state.allocate(),
            name: name.into(),
            slug: slug.into(),
        };
        state.refs.insert((kind, slug.into()), r.clone());
        r
    }

    pub fn seed_prefix(&self, cidr: &str, vrf: Option<u64>, description: &str) -> TargetPrefix {
        let mut state = self.state.lock().unwrap();
        let prefix = TargetPrefix {
            id: state.allocate(),
            cidr: cidr.parse().unwrap(),
            vrf,
            status: "active".into(),
            description: description.into(),
            tags: Default::default(),
            parent: None,
            subscription_label: None,
            subscription_url: None,
        };
        state.prefixes.push(prefix.clone());
        prefix
    }

    pub fn seed_device(&self, name: &str, site: u64, external_id: Option<&str>) -> TargetDevice {
        let mut state = self.state.lock().unwrap();
        let device = TargetDevice {
            id: state.allocate(),
            name: name.into(),
            site,
            external_id: external_id.map(str::to_owned),
        };
        state.devices.push(device.clone());
        device
    }

    pub fn seed_custom_field(&self, name: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate();
        state.custom_fields.insert(name.into(), id);
        id
    }

    pub fn seed_address(&self, address: &str, interface: Option<u64>) -> TargetAddress {
        let mut state = self.state.lock().unwrap();
        let record = TargetAddress {
            id: state.allocate(),
            address: address.parse().unwrap(),
            interface,
        };
        state.addresses.push(record.clone());
        record
    }

    // ── Fault injection ──────────────────────────────────────────────

    /// The next `n` reference lookups fail as if the server were down.
    pub fn fail_ref_lookups(&self, n: usize) {
        self.state.lock().unwrap().failing_ref_lookups = n;
    }

    pub fn fail_prefix_lookups(&self, n: usize) {
        self.state.lock().unwrap().failing_prefix_lookups = n;
    }

    /// The next `n` custom-field creates are rejected by the server.
    pub fn fail_custom_field_creates(&self, n: usize) {
        self.state.lock().unwrap().failing_custom_field_creates = n;
    }

    pub fn queue_device_lookup_error(&self, err: CoreError) {
        self.state.lock().unwrap().device_lookup_errors.push_back(err);
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn count_refs(&self, kind: RefKind) -> usize {
        let state = self.state.lock().unwrap();
        state.refs.keys().filter(|(k, _)| *k == kind).count()
    }

    pub fn find_ref_by_slug(&self, kind: RefKind, slug: &str) -> Option<ObjectRef> {
        let state = self.state.lock().unwrap();
        state.refs.get(&(kind, slug.to_owned())).cloned()
    }

    pub fn prefixes(&self) -> Vec<TargetPrefix> {
        self.state.lock().unwrap().prefixes.clone()
    }

    pub fn prefix(&self, cidr: &str) -> Option<TargetPrefix> {
        let cidr: IpNet = cidr.parse().unwrap();
        self.prefixes().into_iter().find(|p| p.cidr == cidr)
    }

    pub fn devices(&self) -> Vec<TargetDevice> {
        self.state.lock().unwrap().devices.clone()
    }

    pub fn interfaces(&self) -> Vec<TargetInterface> {
        self.state.lock().unwrap().interfaces.clone()
    }

    /// The create payload recorded for a custom field.
    pub fn custom_field(&self, name: &str) -> Option<CustomFieldSpec> {
        let state = self.state.lock().unwrap();
        state.custom_field_specs.iter().find(|f| f.name == name).cloned()
    }

    pub fn addresses(&self) -> Vec<TargetAddress> {
        self.state.lock().unwrap().addresses.clone()
    }

    pub fn journal(&self) -> Vec<String> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Number of create calls that succeeded.
    pub fn creates(&self) -> usize {
        self.journal()
            .iter()
            .filter(|entry| entry.starts_with("create_"))
            .count()
    }
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn find_ref(&self, kind: RefKind, slug: &str) -> Result<Option<ObjectRef>, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_ref_lookups > 0 {
            state.failing_ref_lookups -= 1;
            return Err(lookup_failure(&kind.to_string(), slug));
        }
        Ok(state.refs.get(&(kind, slug.to_owned())).cloned())
    }

    async fn create_ref(&self, spec: &RefSpec) -> Result<ObjectRef, CoreError> {
        let mut state = self.state.lock().unwrap();
        let key = (spec.kind(), spec.slug().to_owned());
        if state.refs.contains_key(&key) {
            return Err(conflict(format!("{} {}", key.0, key.1)));
        }
        let r = ObjectRef {
            id: state.allocate(),
            name: spec.name().to_owned(),
            slug: spec.slug().to_owned(),
        };
        state.journal.push(format!("create_{} {}", key.0, key.1));
        state.refs.insert(key, r.clone());
        Ok(r)
    }

    async fn find_custom_field(&self, name: &str) -> Result<Option<u64>, CoreError> {
        Ok(self.state.lock().unwrap().custom_fields.get(name).copied())
    }

    async fn create_custom_field(&self, spec: &CustomFieldSpec) -> Result<u64, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_custom_field_creates > 0 {
            state.failing_custom_field_creates -= 1;
            return Err(CoreError::Api {
                message: "object_types: Invalid content type".into(),
                status: Some(400),
            });
        }
        if state.custom_fields.contains_key(&spec.name) {
            return Err(conflict(&spec.name));
        }
        let id = state.allocate();
        state.custom_fields.insert(spec.name.clone(), id);
        state.custom_field_specs.push(spec.clone());
        state.journal.push(format!("create_custom_field {}", spec.name));
        Ok(id)
    }

    async fn find_prefixes(&self, cidr: &IpNet) -> Result<Vec<TargetPrefix>, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_prefix_lookups > 0 {
            state.failing_prefix_lookups -= 1;
            return Err(lookup_failure("prefix", &cidr.to_string()));
        }
        Ok(state
            .prefixes
            .iter()
            .filter(|p| p.cidr == *cidr)
            .cloned()
            .collect())
    }

    async fn create_prefix(&self, spec: &PrefixSpec) -> Result<TargetPrefix, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state
            .prefixes
            .iter()
            .any(|p| p.cidr == spec.cidr && p.vrf.is_none())
        {
            return Err(conflict(format!("Duplicate prefix found in global table: {}", spec.cidr)));
        }
        let prefix = TargetPrefix {
            id: state.allocate(),
            cidr: spec.cidr,
            vrf: None,
            status: spec.status.clone(),
            description: spec.description.clone(),
            tags: spec.tags.clone(),
            parent: spec.parent,
            subscription_label: spec.subscription_label.clone(),
            subscription_url: spec.subscription_url.clone(),
        };
        state.journal.push(format!("create_prefix {}", spec.cidr));
        state.prefixes.push(prefix.clone());
        Ok(prefix)
    }

    async fn update_prefix(
        &self,
        current: &TargetPrefix,
        changes: &PrefixChanges,
    ) -> Result<TargetPrefix, CoreError> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .prefixes
            .iter_mut()
            .find(|p| p.id == current.id)
            .ok_or_else(|| CoreError::Internal(format!("no prefix {}", current.id)))?;
        *slot = slot.with_changes(changes);
        let updated = slot.clone();
        state.journal.push(format!("update_prefix {}", current.cidr));
        Ok(updated)
    }

    async fn find_device(&self, name: &str, site: u64) -> Result<Option<TargetDevice>, CoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.device_lookup_errors.pop_front() {
            return Err(err);
        }
        Ok(state
            .devices
            .iter()
            .find(|d| d.name == name && d.site == site)
            .cloned())
    }

    async fn create_device(&self, spec: &DeviceSpec) -> Result<TargetDevice, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state
            .devices
            .iter()
            .any(|d| d.name == spec.name && d.site == spec.site)
        {
            return Err(conflict("Device name must be unique per site."));
        }
        let device = TargetDevice {
            id: state.allocate(),
            name: spec.name.clone(),
            site: spec.site,
            external_id: Some(spec.external_id.clone()),
        };
        state.journal.push(format!("create_device {}", spec.name));
        state.devices.push(device.clone());
        Ok(device)
    }

    async fn find_interface(
        &self,
        device: u64,
        name: &str,
    ) -> Result<Option<TargetInterface>, CoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .interfaces
            .iter()
            .find(|i| i.device == device && i.name == name)
            .cloned())
    }

    async fn create_interface(&self, spec: &InterfaceSpec) -> Result<TargetInterface, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state
            .interfaces
            .iter()
            .any(|i| i.device == spec.device && i.name == spec.name)
        {
            return Err(conflict(&spec.name));
        }
        let interface = TargetInterface {
            id: state.allocate(),
            device: spec.device,
            name: spec.name.clone(),
            mac_address: spec.mac_address.clone(),
        };
        state
            .journal
            .push(format!("create_interface {} {}", spec.device, spec.name));
        state.interfaces.push(interface.clone());
        Ok(interface)
    }

    async fn find_addresses(&self, address: &IpNet) -> Result<Vec<TargetAddress>, CoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .addresses
            .iter()
            .filter(|a| a.address == *address)
            .cloned()
            .collect())
    }

    async fn create_address(&self, spec: &AddressSpec) -> Result<TargetAddress, CoreError> {
        let mut state = self.state.lock().unwrap();
        let record = TargetAddress {
            id: state.allocate(),
            address: spec.address,
            interface: Some(spec.interface),
        };
        state.journal.push(format!("create_address {}", spec.address));
        state.addresses.push(record.clone());
        Ok(record)
    }

    async fn assign_address(
        &self,
        current: &TargetAddress,
        interface: u64,
    ) -> Result<TargetAddress, CoreError> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .addresses
            .iter_mut()
            .find(|a| a.id == current.id)
            .ok_or_else(|| CoreError::Internal(format!("no address {}", current.id)))?;
        slot.interface = Some(interface);
        let updated = slot.clone();
        state
            .journal
            .push(format!("assign_address {} {interface}", current.address));
        Ok(updated)
    }

    async fn unassign_address(&self, current: &TargetAddress) -> Result<TargetAddress, CoreError> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .addresses
            .iter_mut()
            .find(|a| a.id == current.id)
            .ok_or_else(|| CoreError::Internal(format!("no address {}", current.id)))?;
        slot.interface = None;
        let updated = slot.clone();
        state
            .journal
            .push(format!("unassign_address {} {}", current.address, current.id));
        Ok(updated)
    }
}
