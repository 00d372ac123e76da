// ── Snapshot discovery ──
//
// A topology export (JSON or YAML) standing in for live enumeration:
// subscriptions, an optional management-group hierarchy, virtual networks
// with their subnets, NICs and VMs.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::enrich::{NetworkInterface, VirtualMachine, attach_devices};
use super::tree::HierarchyNode;
use super::{Discovery, select_subscriptions};
use crate::config::SubscriptionSelection;
use crate::error::CoreError;
use crate::model::discovered::resource_group_of;
use crate::model::{DiscoveredNetwork, DiscoveredSubnet, Subscription};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSubnet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNetwork {
    pub id: String,
    pub name: String,
    pub subscription_id: String,
    pub location: String,
    #[serde(default)]
    pub address_space: Vec<String>,
    #[serde(default)]
    pub subnets: Vec<SnapshotSubnet>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologySnapshot {
    pub subscriptions: Vec<Subscription>,
    pub management_groups: Option<HierarchyNode>,
    pub virtual_networks: Vec<SnapshotNetwork>,
    pub network_interfaces: Vec<NetworkInterface>,
    pub virtual_machines: Vec<VirtualMachine>,
}

impl TopologySnapshot {
    /// Parse a snapshot file; `.json` is read as JSON, anything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::Discovery {
            message: format!("cannot read snapshot {}: {e}", path.display()),
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&raw).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&raw).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| CoreError::Discovery {
            message: format!("invalid snapshot {}: {message}", path.display()),
        })
    }

    fn display_name(&self, subscription_id: &str) -> String {
        self.subscriptions
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(subscription_id))
            .map(|s| s.display_name.clone())
            .unwrap_or_default()
    }

    /// Networks owned by `subscription`, subnets without devices.
    pub fn networks_for(&self, subscription: &Subscription) -> Vec<DiscoveredNetwork> {
        self.virtual_networks
            .iter()
            .filter(|n| n.subscription_id.eq_ignore_ascii_case(&subscription.id))
            .map(|n| DiscoveredNetwork {
                id: n.id.clone(),
                name: n.name.clone(),
                subscription: Subscription {
                    id: subscription.id.clone(),
                    display_name: if subscription.display_name.is_empty() {
                        self.display_name(&subscription.id)
                    } else {
                        subscription.display_name.clone()
                    },
                },
                region: n.location.clone(),
                resource_group: resource_group_of(&n.id).unwrap_or_default().to_owned(),
                address_space: n.address_space.clone(),
                subnets: n
                    .subnets
                    .iter()
                    .map(|s| DiscoveredSubnet {
                        id: s.id.clone(),
                        name: s.name.clone(),
                        address_prefix: s.address_prefix.clone(),
                        devices: Vec::new(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// [`Discovery`] backed by a [`TopologySnapshot`].
pub struct SnapshotDiscovery {
    snapshot: TopologySnapshot,
    selection: SubscriptionSelection,
}

impl SnapshotDiscovery {
    pub fn new(snapshot: TopologySnapshot, selection: SubscriptionSelection) -> Self {
        Self {
            snapshot,
            selection,
        }
    }

    pub fn from_path(path: &Path, selection: SubscriptionSelection) -> Result<Self, CoreError> {
        Ok(Self::new(TopologySnapshot::from_path(path)?, selection))
    }

    pub fn snapshot(&self) -> &TopologySnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl Discovery for SnapshotDiscovery {
    async fn subscriptions(&self) -> Result<Vec<Subscription>, CoreError> {
        select_subscriptions(
            &self.selection,
            &self.snapshot.subscriptions,
            self.snapshot.management_groups.as_ref(),
        )
    }

    async fn networks(&self, subscription: &Subscription) -> Result<Vec<DiscoveredNetwork>, CoreError> {
        let networks = self.snapshot.networks_for(subscription);
        debug!(subscription = %subscription.id, count = networks.len(), "networks discovered");
        Ok(networks)
    }

    async fn attach_devices(
        &self,
        _subscription: &Subscription,
        networks: &mut [DiscoveredNetwork],
    ) -> Result<(), CoreError> {
        attach_devices(
            networks,
            &self.snapshot.network_interfaces,
            &self.snapshot.virtual_machines,
        );
        Ok(())
    }
}
