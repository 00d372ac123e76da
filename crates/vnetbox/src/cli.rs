//! Clap derive structures for the `vnetbox` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vnetbox -- reconcile cloud virtual networks into NetBox
#[derive(Debug, Parser)]
#[command(
    name = "vnetbox",
    version,
    about = "Reconcile Azure virtual network topology into NetBox",
    long_about = "Reads a discovered Azure topology (virtual networks, subnets, NICs, VMs)\n\
        and upserts it into NetBox as prefixes, devices, interfaces, and IP addresses.\n\
        Runs are idempotent: a second run against the same topology changes nothing.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (YAML, or TOML by extension)
    #[arg(long, short = 'c', env = "VNETBOX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// NetBox URL (overrides netbox.url)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// NetBox API token
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides timeouts.netbox_api)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty tables (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile the discovered topology into NetBox
    Sync(SyncArgs),

    /// Show what a sync would do without writing anything
    Plan(RunArgs),

    /// Preview which networks and subnets survive the configured filters
    Filter(SourceArgs),

    /// Inspect and validate configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Discovery source and scope.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Topology snapshot to read (JSON, or YAML)
    #[arg(long, short = 's', env = "VNETBOX_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Process only this subscription id (overrides azure.subscriptions)
    #[arg(long)]
    pub subscription: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Skip CIDRs that already match several prefixes
    #[arg(long)]
    pub strict_unique: bool,

    /// Hide the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Look up everything, write nothing (same as `plan`)
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration, token masked
    Show,

    /// Print the config file path in use
    Path,

    /// Validate configuration and token resolution
    Validate,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
