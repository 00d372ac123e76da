//! Command handlers. Each loads what it needs; only `sync` and `plan`
//! talk to NetBox.

pub mod config_cmd;
pub mod filter;
pub mod sync;

use std::path::Path;

use vnetbox_config::Config;
use vnetbox_core::SnapshotDiscovery;

use crate::error::CliError;

/// Open the snapshot named on the command line against the configured
/// subscription selection.
pub(crate) fn open_snapshot(path: &Path, config: &Config) -> Result<SnapshotDiscovery, CliError> {
    if !path.exists() {
        return Err(CliError::NoSnapshot {
            path: path.to_path_buf(),
        });
    }
    let selection = config.subscription_selection()?;
    Ok(SnapshotDiscovery::from_path(path, selection)?)
}
