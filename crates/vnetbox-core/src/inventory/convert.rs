// ── API-to-domain type conversions ──
//
// Bridges `vnetbox_api::types` payloads into `crate::model` records and
// back. Read conversions parse CIDRs and flatten nested references;
// write conversions build the REST payloads.

use std::collections::BTreeSet;

use ipnet::IpNet;
use serde_json::{Map, Value};

use vnetbox_api::types::{
    Device, DeviceRole, DeviceType, IdRef, Interface, IpAddress, Manufacturer, NewCustomField,
    NewDevice, NewInterface, NewIpAddress, Prefix, PrefixPatch, Site, Tag, WritablePrefix,
};

use super::{
    AddressSpec, CustomFieldSpec, DeviceSpec, InterfaceSpec, PrefixChanges, PrefixSpec,
    SUBSCRIPTION_FIELD, SUBSCRIPTION_URL_FIELD,
};
use crate::error::CoreError;
use crate::model::{MacAddress, ObjectRef, TargetAddress, TargetDevice, TargetInterface, TargetPrefix};

/// NetBox content type for interface assignments.
pub(super) const INTERFACE_OBJECT_TYPE: &str = "dcim.interface";

// ── Helpers ────────────────────────────────────────────────────────

fn parse_cidr(raw: &str, entity: &str) -> Result<IpNet, CoreError> {
    raw.parse().map_err(|e| {
        CoreError::Internal(format!("{entity} record carries unparseable CIDR '{raw}': {e}"))
    })
}

fn id_refs(ids: &BTreeSet<u64>) -> Vec<IdRef> {
    ids.iter().copied().map(IdRef::from).collect()
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn enrichment_fields(label: Option<&String>, url: Option<&String>) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(label) = label {
        fields.insert(SUBSCRIPTION_FIELD.into(), Value::String(label.clone()));
    }
    if let Some(url) = url {
        fields.insert(SUBSCRIPTION_URL_FIELD.into(), Value::String(url.clone()));
    }
    fields
}

// ── Reference objects ──────────────────────────────────────────────

impl From<Tag> for ObjectRef {
    fn from(t: Tag) -> Self {
        Self {
            id: t.id,
            name: t.name,
            slug: t.slug,
        }
    }
}

impl From<Manufacturer> for ObjectRef {
    fn from(m: Manufacturer) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
        }
    }
}

impl From<DeviceType> for ObjectRef {
    fn from(d: DeviceType) -> Self {
        Self {
            id: d.id,
            name: d.model,
            slug: d.slug,
        }
    }
}

impl From<DeviceRole> for ObjectRef {
    fn from(r: DeviceRole) -> Self {
        Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
        }
    }
}

impl From<Site> for ObjectRef {
    fn from(s: Site) -> Self {
        Self {
            id: s.id,
            name: s.name,
            slug: s.slug,
        }
    }
}

impl From<&CustomFieldSpec> for NewCustomField {
    fn from(spec: &CustomFieldSpec) -> Self {
        Self {
            name: spec.name.clone(),
            label: spec.label.clone(),
            field_type: spec.field_type.clone(),
            description: spec.description.clone(),
            object_types: spec.object_types.clone(),
            required: false,
            default: None,
        }
    }
}

// ── Prefixes ───────────────────────────────────────────────────────

impl TryFrom<Prefix> for TargetPrefix {
    type Error = CoreError;

    fn try_from(p: Prefix) -> Result<Self, Self::Error> {
        let parent = p.parent_id();
        Ok(Self {
            id: p.id,
            cidr: parse_cidr(&p.prefix, "prefix")?,
            vrf: p.vrf.map(|v| v.id),
            status: p.status.map(|s| s.value).unwrap_or_default(),
            description: p.description,
            tags: p.tags.iter().map(|t| t.id).collect(),
            parent,
            subscription_label: string_field(&p.custom_fields, SUBSCRIPTION_FIELD),
            subscription_url: string_field(&p.custom_fields, SUBSCRIPTION_URL_FIELD),
        })
    }
}

impl From<&PrefixSpec> for WritablePrefix {
    fn from(spec: &PrefixSpec) -> Self {
        Self {
            prefix: spec.cidr.to_string(),
            status: spec.status.clone(),
            description: spec.description.clone(),
            tags: id_refs(&spec.tags),
            parent: spec.parent,
            custom_fields: enrichment_fields(
                spec.subscription_label.as_ref(),
                spec.subscription_url.as_ref(),
            ),
        }
    }
}

impl From<&PrefixChanges> for PrefixPatch {
    fn from(changes: &PrefixChanges) -> Self {
        let custom_fields = enrichment_fields(
            changes.subscription_label.as_ref(),
            changes.subscription_url.as_ref(),
        );
        Self {
            status: changes.status.clone(),
            description: changes.description.clone(),
            tags: changes.tags.as_ref().map(id_refs),
            custom_fields: (!custom_fields.is_empty()).then_some(custom_fields),
        }
    }
}

// ── Devices ────────────────────────────────────────────────────────

impl From<Device> for TargetDevice {
    fn from(d: Device) -> Self {
        Self {
            id: d.id,
            name: d.name.unwrap_or_default(),
            site: d.site.map(|s| s.id).unwrap_or_default(),
            external_id: Some(d.description).filter(|desc| !desc.is_empty()),
        }
    }
}

impl From<&DeviceSpec> for NewDevice {
    fn from(spec: &DeviceSpec) -> Self {
        Self {
            name: spec.name.clone(),
            device_type: spec.device_type,
            role: spec.role,
            site: spec.site,
            status: "active".into(),
            description: spec.external_id.clone(),
            tags: id_refs(&spec.tags),
        }
    }
}

impl From<Interface> for TargetInterface {
    fn from(i: Interface) -> Self {
        Self {
            id: i.id,
            device: i.device.map(|d| d.id).unwrap_or_default(),
            name: i.name,
            mac_address: i.mac_address.filter(|m| !m.is_empty()).map(MacAddress::new),
        }
    }
}

impl From<&InterfaceSpec> for NewInterface {
    fn from(spec: &InterfaceSpec) -> Self {
        Self {
            device: spec.device,
            name: spec.name.clone(),
            interface_type: "virtual".into(),
            mac_address: spec.mac_address.as_ref().map(ToString::to_string),
            tags: id_refs(&spec.tags),
        }
    }
}

// ── Addresses ──────────────────────────────────────────────────────

impl TryFrom<IpAddress> for TargetAddress {
    type Error = CoreError;

    fn try_from(a: IpAddress) -> Result<Self, Self::Error> {
        let on_interface = a.assigned_object_type.as_deref() == Some(INTERFACE_OBJECT_TYPE);
        Ok(Self {
            id: a.id,
            address: parse_cidr(&a.address, "IP address")?,
            interface: a.assigned_object_id.filter(|_| on_interface),
        })
    }
}

impl From<&AddressSpec> for NewIpAddress {
    fn from(spec: &AddressSpec) -> Self {
        Self {
            address: spec.address.to_string(),
            status: "active".into(),
            description: spec.description.clone(),
            tags: id_refs(&spec.tags),
            assigned_object_type: INTERFACE_OBJECT_TYPE.into(),
            assigned_object_id: spec.interface,
        }
    }
}
