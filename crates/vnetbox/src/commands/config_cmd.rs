//! Config subcommand handlers.

use owo_colors::OwoColorize;

use vnetbox_core::SubscriptionSelection;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = config::effective_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => {
            let cfg = config::load(global)?.redacted();
            let rendered = match global.output {
                OutputFormat::Json => output::render_json(&cfg)?,
                OutputFormat::Table | OutputFormat::Yaml => cfg.to_yaml()?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }
        ConfigCommand::Validate => {
            let cfg = config::load(global)?;
            cfg.validate()?;
            let connection = cfg.connection_config(global.token.as_deref())?;
            let selection = match cfg.subscription_selection()? {
                SubscriptionSelection::All => "all subscriptions".to_owned(),
                SubscriptionSelection::Specific(id) => format!("subscription {id}"),
                SubscriptionSelection::ManagementGroup { id, name } => format!(
                    "management group {}",
                    id.or(name).unwrap_or_default()
                ),
            };

            let mark = if output::should_color(global.color) {
                "✓".green().to_string()
            } else {
                "✓".to_owned()
            };
            output::print_output(
                &format!(
                    "{mark} configuration valid\n  netbox: {}\n  scope:  {selection}\n  dry run: {}",
                    connection.url, cfg.sync.dry_run
                ),
                global.quiet,
            );
            Ok(())
        }
    }
}
