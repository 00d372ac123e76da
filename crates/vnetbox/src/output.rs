//! Output formatting: table, JSON, YAML.
//!
//! Tables use `tabled`, structured formats use serde. Color only ever
//! touches headline text, never table cells.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use vnetbox_core::{Counts, RunSummary, SubscriptionReport, SubscriptionStatus, UnitError};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list: `to_row` builds table rows, structured formats
/// serialize `data` as-is.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> Vec<R>,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().flat_map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data),
        OutputFormat::Yaml => render_yaml(data),
    }
}

pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn render_json<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(data).map_err(|e| CliError::Render(e.to_string()))
}

pub fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

// ── Run summary ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SubscriptionRow {
    #[tabled(rename = "Subscription")]
    name: String,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Env")]
    environment: String,
    #[tabled(rename = "Networks")]
    networks: usize,
    #[tabled(rename = "Subnets")]
    subnets: usize,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&SubscriptionReport> for SubscriptionRow {
    fn from(r: &SubscriptionReport) -> Self {
        Self {
            name: r.name.clone(),
            id: r.id.clone(),
            environment: r.environment.clone().unwrap_or_else(|| "-".into()),
            networks: r.networks,
            subnets: r.subnets,
            devices: r.devices,
            status: match &r.status {
                SubscriptionStatus::Synced => "synced".into(),
                SubscriptionStatus::Failed(reason) => format!("failed: {reason}"),
            },
        }
    }
}

#[derive(Tabled)]
struct CountsRow {
    #[tabled(rename = "Entity")]
    entity: &'static str,
    #[tabled(rename = "Created")]
    created: u64,
    #[tabled(rename = "Updated")]
    updated: u64,
    #[tabled(rename = "Unchanged")]
    unchanged: u64,
    #[tabled(rename = "Skipped")]
    skipped: u64,
    #[tabled(rename = "Missing")]
    missing: u64,
    #[tabled(rename = "Failed")]
    failed: u64,
}

impl CountsRow {
    fn new(entity: &'static str, c: &Counts) -> Self {
        Self {
            entity,
            created: c.created,
            updated: c.updated,
            unchanged: c.unchanged,
            skipped: c.skipped,
            missing: c.missing,
            failed: c.failed,
        }
    }
}

#[derive(Tabled)]
struct ErrorRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Error")]
    message: String,
}

impl From<&UnitError> for ErrorRow {
    fn from(e: &UnitError) -> Self {
        Self {
            unit: e.unit.clone(),
            message: e.message.clone(),
        }
    }
}

pub fn render_summary(
    summary: &RunSummary,
    format: OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => render_json(summary),
        OutputFormat::Yaml => render_yaml(summary),
        OutputFormat::Table => Ok(summary_table(summary, color)),
    }
}

fn summary_table(summary: &RunSummary, color: bool) -> String {
    let mut sections = Vec::with_capacity(4);
    sections.push(headline(summary, color));

    let subscriptions: Vec<SubscriptionRow> =
        summary.subscriptions.iter().map(SubscriptionRow::from).collect();
    sections.push(render_table(&subscriptions));

    let counts = [
        CountsRow::new("prefixes", &summary.prefixes),
        CountsRow::new("devices", &summary.devices),
        CountsRow::new("interfaces", &summary.interfaces),
        CountsRow::new("ip addresses", &summary.addresses),
    ];
    sections.push(render_table(&counts));

    if !summary.errors.is_empty() {
        let errors: Vec<ErrorRow> = summary.errors.iter().map(ErrorRow::from).collect();
        sections.push(render_table(&errors));
    }
    sections.join("\n\n")
}

fn headline(summary: &RunSummary, color: bool) -> String {
    let mode = if summary.dry_run { "Plan" } else { "Sync" };
    let elapsed = summary
        .finished_at
        .map(|end| format!(" in {:.1}s", duration_secs(end - summary.started_at)))
        .unwrap_or_default();

    if summary.has_failures() {
        let text = format!(
            "{mode} finished with {} error(s){elapsed}",
            summary.errors.len()
        );
        if color { text.red().bold().to_string() } else { text }
    } else {
        let text = format!("{mode} complete{elapsed}");
        if color { text.green().bold().to_string() } else { text }
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn duration_secs(d: chrono::TimeDelta) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}
