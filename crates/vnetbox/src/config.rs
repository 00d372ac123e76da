//! CLI-side configuration: load the file, then apply flag overrides.
//!
//! Core never sees these types; commands receive `SyncSettings` and
//! `ConnectionConfig` built from the merged result.

use vnetbox_config::{Config, SubscriptionsSection};

use crate::cli::{GlobalOpts, RunArgs, SourceArgs};
use crate::error::CliError;

/// Load config from `--config` (which must exist) or the default path.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut config = vnetbox_config::load_config(global.config.as_deref())?;
    apply_global(&mut config, global);
    Ok(config)
}

/// Flags win over file and environment.
fn apply_global(config: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        config.netbox.url = Some(url.clone());
    }
    if global.insecure {
        config.ssl.verify = false;
    }
    if let Some(timeout) = global.timeout {
        config.timeouts.netbox_api = timeout;
    }
}

pub fn apply_source(config: &mut Config, source: &SourceArgs) {
    if let Some(ref id) = source.subscription {
        config.azure.subscriptions = SubscriptionsSection {
            specific_id: Some(id.clone()),
            ..SubscriptionsSection::default()
        };
    }
}

pub fn apply_run(config: &mut Config, run: &RunArgs, dry_run: bool) {
    apply_source(config, &run.source);
    if run.strict_unique {
        config.sync.strict_unique = true;
    }
    if dry_run {
        config.sync.dry_run = true;
    }
}

/// The file that `load` reads.
pub fn effective_path(global: &GlobalOpts) -> std::path::PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(vnetbox_config::config_path)
}
