// ── Discovery seam ──
//
// The cloud side of a run: which subscriptions to cover, their networks,
// and the devices sitting in each subnet.

mod enrich;
mod snapshot;
mod tree;

use async_trait::async_trait;
use tracing::warn;

use crate::config::SubscriptionSelection;
use crate::error::CoreError;
use crate::model::{DiscoveredNetwork, Subscription};

pub use enrich::{IpConfiguration, NetworkInterface, VirtualMachine, attach_devices};
pub use snapshot::{SnapshotDiscovery, SnapshotNetwork, SnapshotSubnet, TopologySnapshot};
pub use tree::{HierarchyNode, NodeKind};

#[async_trait]
pub trait Discovery: Send + Sync {
    /// Subscriptions the run should cover, in processing order.
    async fn subscriptions(&self) -> Result<Vec<Subscription>, CoreError>;

    /// Virtual networks of one subscription, subnets without devices.
    async fn networks(&self, subscription: &Subscription) -> Result<Vec<DiscoveredNetwork>, CoreError>;

    /// Fill in subnet device lists. Called after filtering so only
    /// surviving subnets are enriched.
    async fn attach_devices(
        &self,
        subscription: &Subscription,
        networks: &mut [DiscoveredNetwork],
    ) -> Result<(), CoreError>;
}

/// Resolve a subscription selection against what discovery can see.
///
/// A specific id not present in `available` is still selected, with a
/// placeholder display name. An empty result is a discovery error.
pub fn select_subscriptions(
    selection: &SubscriptionSelection,
    available: &[Subscription],
    hierarchy: Option<&HierarchyNode>,
) -> Result<Vec<Subscription>, CoreError> {
    let selected = match selection {
        SubscriptionSelection::All => available.to_vec(),
        SubscriptionSelection::Specific(id) => {
            let found = available.iter().find(|s| s.id.eq_ignore_ascii_case(id));
            vec![found.cloned().unwrap_or_else(|| {
                warn!(subscription = %id, "subscription not listed, using placeholder name");
                Subscription::new(id, format!("Subscription {id}"))
            })]
        }
        SubscriptionSelection::ManagementGroup { id, name } => {
            let root = hierarchy.ok_or_else(|| CoreError::Discovery {
                message: "management group selection needs a management group hierarchy".into(),
            })?;
            let group = root
                .find_group(id.as_deref(), name.as_deref())
                .ok_or_else(|| CoreError::Discovery {
                    message: format!(
                        "management group {} not found",
                        id.as_deref().or(name.as_deref()).unwrap_or("<unnamed>")
                    ),
                })?;
            group.subscriptions()
        }
    };

    if selected.is_empty() {
        return Err(CoreError::Discovery {
            message: "no subscriptions found for the configured selection".into(),
        });
    }
    Ok(selected)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn available() -> Vec<Subscription> {
        vec![
            Subscription::new("s1", "contoso-dev"),
            Subscription::new("s2", "contoso-prd"),
        ]
    }

    #[test]
    fn specific_id_falls_back_to_placeholder() {
        let picked =
            select_subscriptions(&SubscriptionSelection::Specific("s9".into()), &available(), None)
                .unwrap();
        assert_eq!(picked, vec![Subscription::new("s9", "Subscription s9")]);

        let known =
            select_subscriptions(&SubscriptionSelection::Specific("S2".into()), &available(), None)
                .unwrap();
        assert_eq!(known[0].display_name, "contoso-prd");
    }

    #[test]
    fn management_group_without_hierarchy_fails() {
        let selection = SubscriptionSelection::ManagementGroup {
            id: Some("platform".into()),
            name: None,
        };
        let err = select_subscriptions(&selection, &available(), None).unwrap_err();
        assert!(matches!(err, CoreError::Discovery { .. }));
    }

    #[test]
    fn nothing_selected_is_an_error() {
        assert!(select_subscriptions(&SubscriptionSelection::All, &[], None).is_err());
    }
}
