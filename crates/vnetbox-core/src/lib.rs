//! Reconciliation engine between discovered cloud network topology and a
//! NetBox inventory.
//!
//! - **[`Engine`]** — Runs one batch reconciliation: per subscription it
//!   filters the discovered virtual networks, derives the tag set, upserts
//!   network and subnet prefixes (subnets parented to their enclosing
//!   network prefix), then upserts devices, interfaces, and addresses.
//!
//! - **[`FilterSet`]** — Pure region / resource-group / name-pattern filter
//!   applied to the discovered topology before anything is written.
//!
//! - **[`Inventory`]** — The seam to the target system. [`NetboxInventory`]
//!   speaks the NetBox REST API through `vnetbox-api`;
//!   [`PlanningInventory`] wraps any inventory for dry runs.
//!
//! - **[`Discovery`]** — The seam to the cloud side. [`SnapshotDiscovery`]
//!   reads an exported topology snapshot.
//!
//! - **[`RunContext`] / [`RunSummary`]** — Per-run caches and the outcome
//!   counters handed back to reporting.

pub mod classify;
pub mod config;
pub mod context;
pub mod device;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod filter;
pub mod inventory;
pub mod model;
pub mod naming;
pub mod prefix;
pub mod summary;
pub mod tags;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use classify::{EnvironmentLabel, classify};
pub use config::{
    AxisFilter, ConnectionConfig, CustomFieldSettings, CustomFieldToggle, FilterConfig,
    MappingSettings, NamePatterns, SubscriptionSelection, SyncSettings, TagSettings,
    TlsVerification,
};
pub use context::RunContext;
pub use discovery::{Discovery, SnapshotDiscovery, TopologySnapshot, select_subscriptions};
pub use engine::Engine;
pub use error::CoreError;
pub use filter::FilterSet;
pub use inventory::{Inventory, NetboxInventory, PlanningInventory};
pub use summary::{Counts, RunSummary, SubscriptionReport, SubscriptionStatus, UnitError};

pub use model::{
    DeviceKind, DiscoveredDevice, DiscoveredNetwork, DiscoveredSubnet, MacAddress, ObjectRef,
    Subscription, TargetAddress, TargetDevice, TargetInterface, TargetPrefix,
};
