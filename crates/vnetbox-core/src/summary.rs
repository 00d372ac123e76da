// ── Run summary ──
//
// Outcome counters accumulated during one run and handed to reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-entity outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped: u64,
    /// Would have been created (dry run).
    pub missing: u64,
    pub failed: u64,
}

impl Counts {
    pub fn total(&self) -> u64 {
        self.created + self.updated + self.unchanged + self.skipped + self.missing + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum SubscriptionStatus {
    Synced,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionReport {
    pub id: String,
    pub name: String,
    pub environment: Option<String>,
    pub networks: usize,
    pub subnets: usize,
    pub devices: usize,
    pub status: SubscriptionStatus,
}

/// A contained failure: the unit that failed and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitError {
    pub unit: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub subscriptions: Vec<SubscriptionReport>,
    pub prefixes: Counts,
    pub devices: Counts,
    pub interfaces: Counts,
    /// `updated` counts reassignments.
    pub addresses: Counts,
    pub errors: Vec<UnitError>,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            subscriptions: Vec::new(),
            prefixes: Counts::default(),
            devices: Counts::default(),
            interfaces: Counts::default(),
            addresses: Counts::default(),
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, unit: impl Into<String>, message: impl Into<String>) {
        self.errors.push(UnitError {
            unit: unit.into(),
            message: message.into(),
        });
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// `true` when the run completed but at least one unit failed.
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty()
            || self
                .subscriptions
                .iter()
                .any(|s| matches!(s.status, SubscriptionStatus::Failed(_)))
    }

    /// Creates issued (or planned, in a dry run) across all entities.
    pub fn total_created(&self) -> u64 {
        self.prefixes.created
            + self.devices.created
            + self.interfaces.created
            + self.addresses.created
    }
}
