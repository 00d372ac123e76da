//! `sync` and `plan`: one reconciliation run against NetBox.

use tracing::{debug, info};

use vnetbox_config::Config;
use vnetbox_core::{
    Engine, Inventory, NetboxInventory, PlanningInventory, RunSummary, SnapshotDiscovery,
    SubscriptionStatus, SyncSettings,
};

use crate::cli::{GlobalOpts, RunArgs};
use crate::commands::open_snapshot;
use crate::config;
use crate::error::CliError;
use crate::output;
use crate::progress::RunProgress;

pub async fn handle(
    mut cfg: Config,
    args: &RunArgs,
    dry_run: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    config::apply_run(&mut cfg, args, dry_run);
    cfg.validate()?;

    let connection = cfg.connection_config(global.token.as_deref())?;
    let settings = cfg.sync_settings();
    let discovery = open_snapshot(&args.source.snapshot, &cfg)?;
    let inventory = NetboxInventory::connect(&connection)?;
    info!(url = %connection.url, dry_run = settings.dry_run, "starting reconciliation");

    let progress = RunProgress::start(
        "Reconciling topology into NetBox",
        !args.no_progress && !global.quiet,
        settings.dry_run,
    );
    let result = if settings.dry_run {
        let planning = PlanningInventory::new(inventory);
        run(&planning, &settings, &discovery).await
    } else {
        run(&inventory, &settings, &discovery).await
    };
    progress.finish();
    let summary = result?;

    let rendered = output::render_summary(
        &summary,
        global.output,
        output::should_color(global.color),
    )?;
    output::print_output(&rendered, global.quiet);

    if summary.has_failures() {
        let failed_subscriptions = summary
            .subscriptions
            .iter()
            .filter(|s| !matches!(s.status, SubscriptionStatus::Synced))
            .count();
        return Err(CliError::PartialFailure {
            failed: summary.errors.len() + failed_subscriptions,
        });
    }
    Ok(())
}

async fn run(
    inventory: &dyn Inventory,
    settings: &SyncSettings,
    discovery: &SnapshotDiscovery,
) -> Result<RunSummary, CliError> {
    let engine = Engine::new(inventory, settings)?;
    let summary = engine.run(discovery).await?;
    debug!(created = summary.total_created(), "run returned");
    Ok(summary)
}
