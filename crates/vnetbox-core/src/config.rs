// ── Runtime configuration ──
//
// These types describe *how* to reach the inventory and *what* a run
// should do. They never touch disk: `vnetbox-config` loads files and env,
// validates, and hands these in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

// ── Connection ──────────────────────────────────────────────────────

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (`ssl.verify: false`).
    DangerAcceptInvalid,
}

/// Connection parameters for the NetBox instance.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base URL, e.g. `https://netbox.example.com`.
    pub url: Url,
    pub token: SecretString,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

// ── Subscription selection ──────────────────────────────────────────

/// Which subscriptions a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionSelection {
    All,
    Specific(String),
    ManagementGroup {
        id: Option<String>,
        name: Option<String>,
    },
}

// ── Mapping ─────────────────────────────────────────────────────────

/// How discovered resources are named in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Site name is `{site_prefix}{region}`.
    pub site_prefix: String,
    /// Device type is `{device_type_prefix} {Kind}`.
    pub device_type_prefix: String,
    /// Device role is `{device_role_prefix} {Kind}`.
    pub device_role_prefix: String,
    pub manufacturer: String,
    pub default_interface: String,
    pub max_name_length: usize,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            site_prefix: "Azure-".into(),
            device_type_prefix: "Azure".into(),
            device_role_prefix: "Azure".into(),
            manufacturer: "Microsoft Azure".into(),
            default_interface: "eth0".into(),
            max_name_length: 64,
        }
    }
}

// ── Tags ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSettings {
    pub sync_tag_name: String,
    pub sync_tag_description: String,
    /// Extra tag slugs attached to everything a run touches.
    pub additional: Vec<String>,
}

impl Default for TagSettings {
    fn default() -> Self {
        Self {
            sync_tag_name: "azure-sync".into(),
            sync_tag_description: "Synced from Azure".into(),
            additional: Vec::new(),
        }
    }
}

// ── Custom fields ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomFieldToggle {
    pub enabled: bool,
    pub field_type: String,
    pub description: String,
}

impl Default for CustomFieldToggle {
    fn default() -> Self {
        Self {
            enabled: true,
            field_type: "text".into(),
            description: String::new(),
        }
    }
}

/// Enrichment fields written on prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomFieldSettings {
    pub azure_subscription: CustomFieldToggle,
    pub azure_subscription_url: CustomFieldToggle,
}

impl Default for CustomFieldSettings {
    fn default() -> Self {
        Self {
            azure_subscription: CustomFieldToggle {
                enabled: true,
                field_type: "text".into(),
                description: "Azure Subscription name and ID".into(),
            },
            azure_subscription_url: CustomFieldToggle {
                enabled: true,
                field_type: "url".into(),
                description: "Link to the subscription in the Azure portal".into(),
            },
        }
    }
}

// ── Filters ─────────────────────────────────────────────────────────

/// Include/exclude set for one axis. An empty include set means no
/// restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamePatterns {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

/// Declarative filter configuration, compiled by `FilterSet::compile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub regions: AxisFilter,
    pub resource_groups: AxisFilter,
    pub resource_names: NamePatterns,
}

// ── Run settings ────────────────────────────────────────────────────

/// Everything a reconciliation run needs besides the two seams.
#[derive(Debug, Clone, Default)]
pub struct SyncSettings {
    pub mapping: MappingSettings,
    pub tags: TagSettings,
    pub custom_fields: CustomFieldSettings,
    pub filters: FilterConfig,
    /// Skip CIDRs that already match more than one prefix instead of
    /// updating every match.
    pub strict_unique: bool,
    /// Read-only run: lookups happen, writes are planned and counted.
    pub dry_run: bool,
}
