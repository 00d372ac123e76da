// ── Reconciliation engine ──
//
// Drives one run: Init (custom fields, base tags) -> per subscription
// (filter, enrich, tag, prefixes, subnets, devices) -> Done. Failures are
// contained to the smallest unit; only fatal errors end the run early.

use std::collections::{BTreeSet, HashSet};

use ipnet::IpNet;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::classify::classify;
use crate::config::{CustomFieldToggle, SyncSettings};
use crate::context::RunContext;
use crate::device::{SubnetContext, upsert_device};
use crate::discovery::Discovery;
use crate::error::CoreError;
use crate::filter::FilterSet;
use crate::inventory::{
    CustomFieldSpec, Inventory, PrefixSpec, SUBSCRIPTION_FIELD, SUBSCRIPTION_URL_FIELD,
};
use crate::model::{DiscoveredNetwork, DiscoveredSubnet, Subscription, TargetPrefix};
use crate::naming::label_from_key;
use crate::prefix::upsert_prefix;
use crate::summary::{Counts, RunSummary, SubscriptionReport, SubscriptionStatus};
use crate::tags::{self, TagIntent};

/// Where a run is. Logged on transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RunPhase {
    Init,
    Subscriptions,
    Done,
}

/// Ids already handled this run, so nothing is processed twice.
#[derive(Debug, Default)]
struct Seen {
    subscriptions: HashSet<String>,
    networks: HashSet<String>,
    subnets: HashSet<String>,
}

impl Seen {
    fn first(set: &mut HashSet<String>, id: &str) -> bool {
        set.insert(id.to_lowercase())
    }
}

/// A prefix upserted for one address-space entry.
struct NetworkPrefix {
    cidr: IpNet,
    record: Option<TargetPrefix>,
}

pub struct Engine<'a> {
    inventory: &'a dyn Inventory,
    settings: &'a SyncSettings,
    filter: FilterSet,
}

impl<'a> Engine<'a> {
    /// Compiles the filter up front; a bad pattern fails here, before any
    /// inventory traffic.
    pub fn new(inventory: &'a dyn Inventory, settings: &'a SyncSettings) -> Result<Self, CoreError> {
        Ok(Self {
            inventory,
            settings,
            filter: FilterSet::compile(&settings.filters)?,
        })
    }

    pub async fn run(&self, discovery: &dyn Discovery) -> Result<RunSummary, CoreError> {
        let mut ctx = RunContext::new(self.inventory, self.settings);
        let mut seen = Seen::default();

        info!(phase = %RunPhase::Init, dry_run = self.settings.dry_run, "starting run");
        let subscriptions = discovery.subscriptions().await?;
        self.ensure_custom_fields(&mut ctx).await?;
        let base_tags = tags::base_tags(&mut ctx).await?;

        info!(phase = %RunPhase::Subscriptions, count = subscriptions.len(), "processing subscriptions");
        for subscription in &subscriptions {
            if !Seen::first(&mut seen.subscriptions, &subscription.id) {
                debug!(subscription = %subscription.id, "already processed, skipping");
                continue;
            }

            let span = info_span!("subscription", id = %subscription.id);
            let report = self
                .sync_subscription(&mut ctx, &mut seen, discovery, subscription, &base_tags)
                .instrument(span)
                .await;

            match report {
                Ok(report) => ctx.summary.subscriptions.push(report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(subscription = %subscription, error = %e, "subscription failed, continuing");
                    ctx.summary.subscriptions.push(SubscriptionReport {
                        id: subscription.id.clone(),
                        name: subscription.display_name.clone(),
                        environment: None,
                        networks: 0,
                        subnets: 0,
                        devices: 0,
                        status: SubscriptionStatus::Failed(e.to_string()),
                    });
                }
            }
        }

        ctx.summary.finish();
        info!(
            phase = %RunPhase::Done,
            prefixes_created = ctx.summary.prefixes.created,
            devices_created = ctx.summary.devices.created,
            errors = ctx.summary.errors.len(),
            "run finished"
        );
        Ok(ctx.summary)
    }

    // ── Init ─────────────────────────────────────────────────────────

    /// Lookup-or-create the prefix enrichment fields. Non-fatal failures
    /// are recorded and the run goes on without them.
    async fn ensure_custom_fields(&self, ctx: &mut RunContext<'_>) -> Result<(), CoreError> {
        let fields = &self.settings.custom_fields;
        for (name, toggle) in [
            (SUBSCRIPTION_FIELD, &fields.azure_subscription),
            (SUBSCRIPTION_URL_FIELD, &fields.azure_subscription_url),
        ] {
            if !toggle.enabled {
                continue;
            }
            if let Err(e) = ensure_custom_field(ctx, name, toggle).await {
                if e.is_fatal() {
                    return Err(e);
                }
                error!(field = name, error = %e, "could not ensure custom field");
                ctx.summary.record_error(format!("custom field {name}"), e.to_string());
            }
        }
        Ok(())
    }

    // ── Per subscription ─────────────────────────────────────────────

    async fn sync_subscription(
        &self,
        ctx: &mut RunContext<'_>,
        seen: &mut Seen,
        discovery: &dyn Discovery,
        subscription: &Subscription,
        base_tags: &BTreeSet<u64>,
    ) -> Result<SubscriptionReport, CoreError> {
        let discovered = discovery.networks(subscription).await?;
        let mut networks = self.filter.apply(&discovered);
        info!(
            discovered = discovered.len(),
            kept = networks.len(),
            "networks after filtering"
        );
        discovery.attach_devices(subscription, &mut networks).await?;

        let environment = classify(&subscription.display_name);
        let mut subscription_tags = base_tags.clone();
        match environment {
            Some(label) => {
                let tag = tags::resolve(ctx, &TagIntent::Environment(label)).await?;
                subscription_tags.insert(tag.id);
            }
            None => warn!(name = %subscription.display_name, "no environment detected"),
        }

        let mut report = SubscriptionReport {
            id: subscription.id.clone(),
            name: subscription.display_name.clone(),
            environment: environment.map(|e| e.to_string()),
            networks: 0,
            subnets: 0,
            devices: 0,
            status: SubscriptionStatus::Synced,
        };

        for network in &networks {
            if !Seen::first(&mut seen.networks, &network.id) {
                debug!(network = %network.name, "already processed, skipping");
                continue;
            }
            report.networks += 1;

            let result = self
                .sync_network(ctx, seen, &mut report, network, &subscription_tags)
                .await;
            contain(ctx, Unit::Network, &format!("network {}", network.name), result)?;
        }

        Ok(report)
    }

    async fn sync_network(
        &self,
        ctx: &mut RunContext<'_>,
        seen: &mut Seen,
        report: &mut SubscriptionReport,
        network: &DiscoveredNetwork,
        subscription_tags: &BTreeSet<u64>,
    ) -> Result<(), CoreError> {
        let region = tags::resolve(ctx, &TagIntent::Region(network.region.clone())).await?;
        let mut network_tags = subscription_tags.clone();
        network_tags.insert(region.id);

        let mut parents = Vec::with_capacity(network.address_space.len());
        for raw in &network.address_space {
            let Some(cidr) = parse_cidr(ctx, &format!("address space {raw} of {}", network.name), raw)
            else {
                continue;
            };
            let spec = self.prefix_spec(
                cidr,
                format!(
                    "Azure VNet: {} (Subscription: {})",
                    network.name, network.subscription.id
                ),
                &network_tags,
                None,
                &network.subscription,
            );
            let result = upsert_prefix(ctx, &spec).await;
            let outcome = contain(ctx, Unit::Prefix, &format!("prefix {cidr}"), result)?;
            parents.push(NetworkPrefix {
                cidr,
                record: outcome.and_then(|o| o.prefix),
            });
        }

        for subnet in &network.subnets {
            if !Seen::first(&mut seen.subnets, &subnet.id) {
                debug!(subnet = %subnet.name, "already processed, skipping");
                continue;
            }
            report.subnets += 1;
            self.sync_subnet(ctx, report, network, subnet, &parents, &network_tags)
                .await?;
        }
        Ok(())
    }

    async fn sync_subnet(
        &self,
        ctx: &mut RunContext<'_>,
        report: &mut SubscriptionReport,
        network: &DiscoveredNetwork,
        subnet: &DiscoveredSubnet,
        parents: &[NetworkPrefix],
        network_tags: &BTreeSet<u64>,
    ) -> Result<(), CoreError> {
        let Some(raw) = subnet.address_prefix.as_deref() else {
            warn!(subnet = %subnet.name, "subnet has no address prefix, skipping");
            ctx.summary.prefixes.skipped += 1;
            return Ok(());
        };
        let Some(cidr) = parse_cidr(ctx, &format!("subnet {}", subnet.name), raw) else {
            return Ok(());
        };

        // Most specific enclosing network prefix.
        let parent = parents
            .iter()
            .filter(|p| p.cidr.contains(&cidr))
            .max_by_key(|p| p.cidr.prefix_len());
        match parent.and_then(|p| p.record.as_ref()) {
            Some(parent) => {
                let spec = self.prefix_spec(
                    cidr,
                    format!("Azure Subnet: {} (VNet: {})", subnet.name, network.name),
                    network_tags,
                    Some(parent.id),
                    &network.subscription,
                );
                let result = upsert_prefix(ctx, &spec).await;
                contain(ctx, Unit::Prefix, &format!("prefix {cidr}"), result)?;
            }
            None => {
                warn!(
                    subnet = %subnet.name,
                    %cidr,
                    "no upserted network prefix encloses this subnet, skipping its prefix"
                );
                ctx.summary.prefixes.skipped += 1;
            }
        }

        let subnet_ctx = SubnetContext {
            network: &network.name,
            subnet: &subnet.name,
            tags: network_tags,
        };
        for device in &subnet.devices {
            report.devices += 1;
            let result = upsert_device(ctx, &subnet_ctx, device).await;
            contain(ctx, Unit::Device, &format!("device {}", device.name), result)?;
        }
        Ok(())
    }

    fn prefix_spec(
        &self,
        cidr: IpNet,
        description: String,
        tags: &BTreeSet<u64>,
        parent: Option<u64>,
        subscription: &Subscription,
    ) -> PrefixSpec {
        let fields = &self.settings.custom_fields;
        PrefixSpec {
            cidr,
            status: "active".into(),
            description,
            tags: tags.clone(),
            parent,
            subscription_label: fields
                .azure_subscription
                .enabled
                .then(|| subscription.label()),
            subscription_url: fields
                .azure_subscription_url
                .enabled
                .then(|| subscription.console_url()),
        }
    }
}

async fn ensure_custom_field(
    ctx: &RunContext<'_>,
    name: &str,
    toggle: &CustomFieldToggle,
) -> Result<(), CoreError> {
    match ctx.inventory.find_custom_field(name).await {
        Ok(Some(_)) => return Ok(()),
        Ok(None) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => warn!(field = name, error = %e, "custom field lookup failed, treating as not found"),
    }

    let spec = CustomFieldSpec {
        name: name.to_owned(),
        label: label_from_key(name),
        field_type: toggle.field_type.clone(),
        description: toggle.description.clone(),
        object_types: vec!["ipam.prefix".into()],
    };
    match ctx.inventory.create_custom_field(&spec).await {
        Ok(_) => {
            info!(field = name, "created custom field");
            Ok(())
        }
        Err(e) if e.is_conflict() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Parse a discovered CIDR; an invalid one is a validation skip.
fn parse_cidr(ctx: &mut RunContext<'_>, unit: &str, raw: &str) -> Option<IpNet> {
    match raw.trim().parse::<IpNet>() {
        Ok(cidr) => Some(cidr.trunc()),
        Err(e) => {
            warn!(unit, raw, error = %e, "invalid CIDR, skipping");
            ctx.summary.prefixes.skipped += 1;
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Network,
    Prefix,
    Device,
}

impl Unit {
    fn counts(self, summary: &mut RunSummary) -> Option<&mut Counts> {
        match self {
            Self::Network => None,
            Self::Prefix => Some(&mut summary.prefixes),
            Self::Device => Some(&mut summary.devices),
        }
    }
}

/// Contain a unit's failure: fatal errors propagate, validation skips are
/// counted as skipped, anything else as failed and recorded.
fn contain<T>(
    ctx: &mut RunContext<'_>,
    unit: Unit,
    label: &str,
    result: Result<T, CoreError>,
) -> Result<Option<T>, CoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) if e.is_validation() => {
            warn!(unit = label, reason = %e, "skipped");
            if let Some(counts) = unit.counts(&mut ctx.summary) {
                counts.skipped += 1;
            }
            Ok(None)
        }
        Err(e) => {
            error!(unit = label, error = %e, "failed");
            if let Some(counts) = unit.counts(&mut ctx.summary) {
                counts.failed += 1;
            }
            ctx.summary.record_error(label, e.to_string());
            Ok(None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::SubscriptionSelection;
    use crate::discovery::{
        IpConfiguration, NetworkInterface, SnapshotDiscovery, SnapshotNetwork, SnapshotSubnet,
        TopologySnapshot, VirtualMachine,
    };
    use crate::inventory::{PlanningInventory, RefKind};
    use crate::testing::MemoryInventory;

    const VNET: &str = "/subscriptions/s1/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/hub";

    fn snapshot() -> TopologySnapshot {
        let subnet_id = format!("{VNET}/subnets/app");
        let vm_id = "/subscriptions/s1/resourceGroups/rg-app/providers/Microsoft.Compute/virtualMachines/web01";
        TopologySnapshot {
            subscriptions: vec![Subscription::new("s1", "contoso-dev")],
            management_groups: None,
            virtual_networks: vec![SnapshotNetwork {
                id: VNET.into(),
                name: "hub".into(),
                subscription_id: "s1".into(),
                location: "westeurope".into(),
                address_space: vec!["10.0.0.0/16".into()],
                subnets: vec![SnapshotSubnet {
                    id: subnet_id.clone(),
                    name: "app".into(),
                    address_prefix: Some("10.0.1.0/24".into()),
                }],
            }],
            network_interfaces: vec![NetworkInterface {
                id: "/subscriptions/s1/resourceGroups/rg-app/providers/Microsoft.Network/networkInterfaces/web01-nic".into(),
                name: "web01-nic".into(),
                location: "westeurope".into(),
                mac_address: None,
                virtual_machine_id: Some(vm_id.into()),
                ip_configurations: vec![IpConfiguration {
                    subnet_id: Some(subnet_id),
                    private_ip_address: "10.0.1.5".parse().ok(),
                }],
            }],
            virtual_machines: vec![VirtualMachine {
                id: vm_id.into(),
                name: "web01".into(),
            }],
        }
    }

    fn discovery(snapshot: TopologySnapshot) -> SnapshotDiscovery {
        SnapshotDiscovery::new(snapshot, SubscriptionSelection::All)
    }

    #[tokio::test]
    async fn end_to_end_single_device() {
        let inventory = MemoryInventory::new();
        let settings = SyncSettings::default();
        let engine = Engine::new(&inventory, &settings).unwrap();

        let summary = engine.run(&discovery(snapshot())).await.unwrap();

        assert_eq!(summary.prefixes.created, 2);
        assert_eq!(summary.devices.created, 1);
        assert_eq!(summary.interfaces.created, 1);
        assert_eq!(summary.addresses.created, 1);
        assert!(!summary.has_failures());

        // Network before subnet, subnet parented to network.
        let journal = inventory.journal();
        let net_at = journal.iter().position(|e| e == "create_prefix 10.0.0.0/16").unwrap();
        let sub_at = journal.iter().position(|e| e == "create_prefix 10.0.1.0/24").unwrap();
        assert!(net_at < sub_at);
        let network = inventory.prefix("10.0.0.0/16").unwrap();
        let subnet = inventory.prefix("10.0.1.0/24").unwrap();
        assert_eq!(subnet.parent, Some(network.id));
        assert!(network.cidr.contains(&subnet.cidr));

        // Tags: sync, environment, region.
        let expected: BTreeSet<u64> = ["azure-sync", "dev", "westeurope"]
            .iter()
            .map(|slug| inventory.find_ref_by_slug(RefKind::Tag, slug).unwrap().id)
            .collect();
        assert_eq!(network.tags, expected);
        assert_eq!(subnet.tags, expected);
        assert_eq!(
            network.subscription_label.as_deref(),
            Some("contoso-dev - s1")
        );
    }

    #[tokio::test]
    async fn second_run_creates_nothing() {
        let inventory = MemoryInventory::new();
        let settings = SyncSettings::default();
        let engine = Engine::new(&inventory, &settings).unwrap();

        engine.run(&discovery(snapshot())).await.unwrap();
        let creates = inventory.creates();
        let summary = engine.run(&discovery(snapshot())).await.unwrap();

        assert_eq!(inventory.creates(), creates);
        assert_eq!(summary.total_created(), 0);
        assert_eq!(summary.prefixes.updated, 0);
        assert_eq!(summary.prefixes.unchanged, 2);
        assert_eq!(summary.devices.unchanged, 1);
    }

    #[tokio::test]
    async fn subnet_without_prefix_is_skipped() {
        let mut snap = snapshot();
        snap.virtual_networks[0].subnets[0].address_prefix = None;
        let inventory = MemoryInventory::new();
        let settings = SyncSettings::default();
        let engine = Engine::new(&inventory, &settings).unwrap();

        let summary = engine.run(&discovery(snap)).await.unwrap();

        assert_eq!(summary.prefixes.created, 1);
        assert_eq!(summary.prefixes.skipped, 1);
        assert_eq!(summary.devices.created, 0);
        assert!(!summary.has_failures());
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let planning = PlanningInventory::new(MemoryInventory::new());
        let settings = SyncSettings {
            dry_run: true,
            ..SyncSettings::default()
        };
        let engine = Engine::new(&planning, &settings).unwrap();

        let summary = engine.run(&discovery(snapshot())).await.unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.prefixes.missing, 2);
        assert_eq!(summary.devices.created, 1);
        assert!(planning.inner().journal().is_empty());
    }

    /// Fails network enumeration for one subscription.
    struct FlakyDiscovery {
        inner: SnapshotDiscovery,
        broken: &'static str,
    }

    #[async_trait]
    impl Discovery for FlakyDiscovery {
        async fn subscriptions(&self) -> Result<Vec<Subscription>, CoreError> {
            self.inner.subscriptions().await
        }

        async fn networks(&self, subscription: &Subscription) -> Result<Vec<DiscoveredNetwork>, CoreError> {
            if subscription.id == self.broken {
                return Err(CoreError::Discovery {
                    message: "403 AuthorizationFailed".into(),
                });
            }
            self.inner.networks(subscription).await
        }

        async fn attach_devices(
            &self,
            subscription: &Subscription,
            networks: &mut [DiscoveredNetwork],
        ) -> Result<(), CoreError> {
            self.inner.attach_devices(subscription, networks).await
        }
    }

    #[tokio::test]
    async fn failing_subscription_does_not_stop_others() {
        let mut snap = snapshot();
        snap.subscriptions.insert(0, Subscription::new("s0", "legacy-prd"));
        let flaky = FlakyDiscovery {
            inner: discovery(snap),
            broken: "s0",
        };
        let inventory = MemoryInventory::new();
        let settings = SyncSettings::default();
        let engine = Engine::new(&inventory, &settings).unwrap();

        let summary = engine.run(&flaky).await.unwrap();

        assert_eq!(summary.subscriptions.len(), 2);
        assert!(matches!(summary.subscriptions[0].status, SubscriptionStatus::Failed(_)));
        assert_eq!(summary.subscriptions[1].status, SubscriptionStatus::Synced);
        assert_eq!(summary.prefixes.created, 2);
        assert!(summary.has_failures());
    }

    #[tokio::test]
    async fn custom_fields_created_on_prefixes() {
        let inventory = MemoryInventory::new();
        let settings = SyncSettings::default();
        let engine = Engine::new(&inventory, &settings).unwrap();

        engine.run(&discovery(snapshot())).await.unwrap();

        let field = inventory.custom_field(SUBSCRIPTION_FIELD).unwrap();
        assert_eq!(field.label, "Azure Subscription");
        assert_eq!(field.field_type, "text");
        assert_eq!(field.object_types, vec!["ipam.prefix".to_string()]);
        let url = inventory.custom_field(SUBSCRIPTION_URL_FIELD).unwrap();
        assert_eq!(url.label, "Azure Subscription Url");
        assert_eq!(url.field_type, "url");
    }

    #[tokio::test]
    async fn disabled_custom_field_is_left_alone() {
        let inventory = MemoryInventory::new();
        let mut settings = SyncSettings::default();
        settings.custom_fields.azure_subscription_url.enabled = false;
        let engine = Engine::new(&inventory, &settings).unwrap();

        engine.run(&discovery(snapshot())).await.unwrap();

        assert!(inventory.custom_field(SUBSCRIPTION_FIELD).is_some());
        assert!(inventory.custom_field(SUBSCRIPTION_URL_FIELD).is_none());
    }

    #[tokio::test]
    async fn existing_custom_field_is_reused() {
        let inventory = MemoryInventory::new();
        inventory.seed_custom_field(SUBSCRIPTION_FIELD);
        let settings = SyncSettings::default();
        let engine = Engine::new(&inventory, &settings).unwrap();

        engine.run(&discovery(snapshot())).await.unwrap();

        let field_creates: Vec<String> = inventory
            .journal()
            .into_iter()
            .filter(|e| e.starts_with("create_custom_field"))
            .collect();
        assert_eq!(
            field_creates,
            vec![format!("create_custom_field {SUBSCRIPTION_URL_FIELD}")]
        );
    }

    #[tokio::test]
    async fn custom_field_failure_is_recorded_and_run_continues() {
        let inventory = MemoryInventory::new();
        inventory.fail_custom_field_creates(1);
        let settings = SyncSettings::default();
        let engine = Engine::new(&inventory, &settings).unwrap();

        let summary = engine.run(&discovery(snapshot())).await.unwrap();

        assert!(summary.has_failures());
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].unit, format!("custom field {SUBSCRIPTION_FIELD}"));
        assert!(inventory.custom_field(SUBSCRIPTION_URL_FIELD).is_some());
        assert_eq!(summary.prefixes.created, 2);
        assert_eq!(summary.devices.created, 1);
    }

    #[tokio::test]
    async fn duplicate_networks_processed_once() {
        let mut snap = snapshot();
        let copy = snap.virtual_networks[0].clone();
        snap.virtual_networks.push(copy);
        let inventory = MemoryInventory::new();
        let settings = SyncSettings::default();
        let engine = Engine::new(&inventory, &settings).unwrap();

        let summary = engine.run(&discovery(snap)).await.unwrap();

        assert_eq!(summary.subscriptions[0].networks, 1);
        assert_eq!(summary.prefixes.total(), 2);
    }
}
