//! `filter`: apply the configured filters to a snapshot and show what
//! a run would cover. Never contacts NetBox.

use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use vnetbox_config::Config;
use vnetbox_core::{Discovery, DiscoveredNetwork, FilterSet};

use crate::cli::{GlobalOpts, OutputFormat, SourceArgs};
use crate::commands::open_snapshot;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct SubnetPreview {
    name: String,
    address_prefix: Option<String>,
    devices: Vec<String>,
}

#[derive(Debug, Serialize)]
struct NetworkPreview {
    subscription: String,
    network: String,
    region: String,
    resource_group: String,
    address_space: Vec<String>,
    subnets: Vec<SubnetPreview>,
}

impl From<&DiscoveredNetwork> for NetworkPreview {
    fn from(n: &DiscoveredNetwork) -> Self {
        Self {
            subscription: n.subscription.label(),
            network: n.name.clone(),
            region: n.region.clone(),
            resource_group: n.resource_group.clone(),
            address_space: n.address_space.clone(),
            subnets: n
                .subnets
                .iter()
                .map(|s| SubnetPreview {
                    name: s.name.clone(),
                    address_prefix: s.address_prefix.clone(),
                    devices: s.devices.iter().map(|d| d.name.clone()).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Resource group")]
    resource_group: String,
    #[tabled(rename = "Subnet")]
    subnet: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Devices")]
    devices: usize,
}

fn rows(n: &NetworkPreview) -> Vec<PreviewRow> {
    let row = |subnet: &str, prefix: String, devices: usize| PreviewRow {
        network: n.network.clone(),
        region: n.region.clone(),
        resource_group: n.resource_group.clone(),
        subnet: subnet.to_owned(),
        prefix,
        devices,
    };
    let mut out = vec![row("-", n.address_space.join(", "), 0)];
    out.extend(n.subnets.iter().map(|s| {
        row(
            &s.name,
            s.address_prefix.clone().unwrap_or_else(|| "-".into()),
            s.devices.len(),
        )
    }));
    out
}

pub async fn handle(mut cfg: Config, args: &SourceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    config::apply_source(&mut cfg, args);
    let filter = FilterSet::compile(&cfg.filters)?;
    let discovery = open_snapshot(&args.snapshot, &cfg)?;

    let mut previews = Vec::new();
    let mut discovered = 0;
    for subscription in discovery.subscriptions().await? {
        let networks = discovery.networks(&subscription).await?;
        discovered += networks.len();
        let mut kept = filter.apply(&networks);
        discovery.attach_devices(&subscription, &mut kept).await?;
        previews.extend(kept.iter().map(NetworkPreview::from));
    }
    info!(discovered, kept = previews.len(), "filter preview");

    let mut rendered = output::render_list(global.output, &previews, rows)?;
    if global.output == OutputFormat::Table {
        rendered.push_str(&format!(
            "\n{} of {discovered} network(s) kept",
            previews.len()
        ));
    }
    output::print_output(&rendered, global.quiet);
    Ok(())
}
