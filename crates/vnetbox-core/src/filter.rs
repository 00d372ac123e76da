// ── Filter pipeline ──
//
// Pure transform over discovered topology. Networks are checked on
// region, then resource group, then name; surviving networks keep only
// the subnets whose names pass the name patterns.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::config::{AxisFilter, FilterConfig};
use crate::error::CoreError;
use crate::model::DiscoveredNetwork;

/// Include/exclude set, compared case-insensitively.
#[derive(Debug, Clone, Default)]
struct Axis {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl Axis {
    fn from_config(cfg: &AxisFilter) -> Self {
        let norm = |values: &[String]| values.iter().map(|v| v.to_lowercase()).collect();
        Self {
            include: norm(&cfg.include),
            exclude: norm(&cfg.exclude),
        }
    }

    fn admits(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        if self.exclude.contains(&value) {
            return false;
        }
        self.include.is_empty() || self.include.contains(&value)
    }
}

/// Compiled filter configuration.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    regions: Axis,
    resource_groups: Axis,
    include_patterns: Vec<Regex>,
    exclude_patterns: Vec<Regex>,
}

impl FilterSet {
    /// Compile patterns. An invalid regex is a configuration error.
    pub fn compile(config: &FilterConfig) -> Result<Self, CoreError> {
        Ok(Self {
            regions: Axis::from_config(&config.regions),
            resource_groups: Axis::from_config(&config.resource_groups),
            include_patterns: compile_patterns(&config.resource_names.include_patterns)?,
            exclude_patterns: compile_patterns(&config.resource_names.exclude_patterns)?,
        })
    }

    /// Names are matched with search semantics (pattern anywhere in the
    /// name); anchor with `^`/`$` for whole-name matches.
    pub fn admits_name(&self, name: &str) -> bool {
        if self.exclude_patterns.iter().any(|re| re.is_match(name)) {
            return false;
        }
        self.include_patterns.is_empty() || self.include_patterns.iter().any(|re| re.is_match(name))
    }

    /// Network-level checks only; subnets are not considered.
    pub fn admits_network(&self, network: &DiscoveredNetwork) -> bool {
        if !self.regions.admits(&network.region) {
            debug!(network = %network.name, region = %network.region, "filtered out by region");
            return false;
        }
        if !self.resource_groups.admits(&network.resource_group) {
            debug!(
                network = %network.name,
                resource_group = %network.resource_group,
                "filtered out by resource group"
            );
            return false;
        }
        if !self.admits_name(&network.name) {
            debug!(network = %network.name, "filtered out by name pattern");
            return false;
        }
        true
    }

    /// Produce the filtered topology. Networks left without subnets are
    /// dropped.
    pub fn apply(&self, networks: &[DiscoveredNetwork]) -> Vec<DiscoveredNetwork> {
        networks
            .iter()
            .filter(|network| self.admits_network(network))
            .filter_map(|network| {
                let subnets: Vec<_> = network
                    .subnets
                    .iter()
                    .filter(|subnet| self.admits_name(&subnet.name))
                    .cloned()
                    .collect();
                if subnets.is_empty() {
                    debug!(network = %network.name, "no subnets left after filtering, dropping");
                    return None;
                }
                Some(DiscoveredNetwork {
                    subnets,
                    ..network.clone()
                })
            })
            .collect()
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, CoreError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| CoreError::Config {
                message: format!("invalid filter pattern '{p}': {e}"),
            })
        })
        .collect()
}
