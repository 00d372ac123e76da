// NetBox REST payloads.
//
// Read models are lenient (`#[serde(default)]` everywhere a field may be
// absent or null across NetBox 3.x/4.x). Write models serialize only the
// fields we manage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Envelope ─────────────────────────────────────────────────────────

/// Paginated list envelope: `{ count, next, previous, results }`.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

// ── Shared shapes ────────────────────────────────────────────────────

/// Brief nested representation of a related object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedObject {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

/// Choice field as returned by NetBox: `{"value": "active", "label": "Active"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceValue {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Reference by primary key, used in write payloads (`tags: [{"id": 3}]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdRef {
    pub id: u64,
}

impl From<u64> for IdRef {
    fn from(id: u64) -> Self {
        Self { id }
    }
}

// ── extras ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomField {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub label: String,
}

/// Custom field definition. NetBox 4.x names the target models
/// `object_types` (3.x used `content_types`).
#[derive(Debug, Clone, Serialize)]
pub struct NewCustomField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: String,
    pub object_types: Vec<String>,
    pub required: bool,
    pub default: Option<Value>,
}

// ── ipam ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Prefix {
    pub id: u64,
    pub prefix: String,
    #[serde(default)]
    pub status: Option<ChoiceValue>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<NestedObject>,
    #[serde(default)]
    pub vrf: Option<NestedObject>,
    /// Either a bare id or a nested object, depending on the serializer.
    #[serde(default)]
    pub parent: Option<Value>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

impl Prefix {
    pub fn parent_id(&self) -> Option<u64> {
        match self.parent.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::Object(obj) => obj.get("id").and_then(Value::as_u64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WritablePrefix {
    pub prefix: String,
    pub status: String,
    pub description: String,
    pub tags: Vec<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub custom_fields: Map<String, Value>,
}

/// Partial update for a prefix; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrefixPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<IdRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpAddress {
    pub id: u64,
    pub address: String,
    #[serde(default)]
    pub status: Option<ChoiceValue>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_object_type: Option<String>,
    #[serde(default)]
    pub assigned_object_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIpAddress {
    pub address: String,
    pub status: String,
    pub description: String,
    pub tags: Vec<IdRef>,
    pub assigned_object_type: String,
    pub assigned_object_id: u64,
}

/// Assignment PATCH body. Both fields are always sent; `None` serializes
/// as `null`, which detaches the address.
#[derive(Debug, Clone, Serialize)]
pub struct IpAddressAssignment {
    pub assigned_object_type: Option<String>,
    pub assigned_object_id: Option<u64>,
}

impl IpAddressAssignment {
    pub fn to_object(object_type: &str, id: u64) -> Self {
        Self {
            assigned_object_type: Some(object_type.to_owned()),
            assigned_object_id: Some(id),
        }
    }

    pub fn detached() -> Self {
        Self {
            assigned_object_type: None,
            assigned_object_id: None,
        }
    }
}

// ── dcim ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Manufacturer {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewManufacturer {
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceType {
    pub id: u64,
    pub model: String,
    pub slug: String,
    #[serde(default)]
    pub manufacturer: Option<NestedObject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDeviceType {
    pub model: String,
    pub slug: String,
    pub manufacturer: u64,
    pub tags: Vec<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRole {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub vm_role: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDeviceRole {
    pub name: String,
    pub slug: String,
    pub vm_role: bool,
    pub tags: Vec<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Site {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub status: Option<ChoiceValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSite {
    pub name: String,
    pub slug: String,
    pub status: String,
    pub description: String,
    pub tags: Vec<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub site: Option<NestedObject>,
    #[serde(default)]
    pub status: Option<ChoiceValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDevice {
    pub name: String,
    pub device_type: u64,
    pub role: u64,
    pub site: u64,
    pub status: String,
    pub description: String,
    pub tags: Vec<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interface {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub device: Option<NestedObject>,
    #[serde(default)]
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewInterface {
    pub device: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    pub tags: Vec<IdRef>,
}
