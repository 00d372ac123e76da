mod cli;
mod commands;
mod config;
mod error;
mod output;
mod progress;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vnetbox_config::{LogFormat, LoggingSection};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins, then `-v`, then the config's `logging.level`.
fn init_tracing(verbosity: u8, logging: Option<&LoggingSection>) {
    let fallback = match verbosity {
        0 => logging.map_or("warn", |l| l.level.as_str()),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if logging.is_some_and(|l| l.format == LogFormat::Json) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "vnetbox", &mut std::io::stdout());
            Ok(())
        }

        Command::Config(args) => {
            init_tracing(cli.global.verbose, None);
            commands::config_cmd::handle(&args, &cli.global)
        }

        cmd => {
            let cfg = config::load(&cli.global)?;
            init_tracing(cli.global.verbose, Some(&cfg.logging));
            tracing::debug!(command = ?cmd, "dispatching command");

            match cmd {
                Command::Sync(args) => {
                    commands::sync::handle(cfg, &args.run, args.dry_run, &cli.global).await
                }
                Command::Plan(args) => commands::sync::handle(cfg, &args, true, &cli.global).await,
                Command::Filter(args) => commands::filter::handle(cfg, &args, &cli.global).await,
                Command::Config(_) | Command::Completions(_) => Ok(()),
            }
        }
    }
}
