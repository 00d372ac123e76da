// ── Prefix reconciler ──
//
// Upserts address-block records for networks and subnets. CIDR is the
// natural key; one CIDR may legitimately exist once per routing scope.

use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::error::CoreError;
use crate::inventory::{PrefixChanges, PrefixSpec};
use crate::model::TargetPrefix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixAction {
    Created,
    Updated,
    Unchanged,
    /// Ambiguous CIDR left alone in strict mode.
    Skipped,
    /// Absent and not created (dry run).
    Missing,
}

#[derive(Debug, Clone)]
pub struct PrefixOutcome {
    pub action: PrefixAction,
    /// The record later upserts link to. `None` only when skipped.
    pub prefix: Option<TargetPrefix>,
}

impl PrefixOutcome {
    pub fn was_created(&self) -> bool {
        matches!(self.action, PrefixAction::Created | PrefixAction::Missing)
    }
}

/// Field-by-field diff of an existing record against the desired state.
/// Enrichment fields are only compared when supplied. The parent link is
/// never diffed: it is written on create and not read back.
pub fn diff_prefix(existing: &TargetPrefix, spec: &PrefixSpec) -> PrefixChanges {
    let mut changes = PrefixChanges::default();
    if existing.status != spec.status {
        changes.status = Some(spec.status.clone());
    }
    if existing.description != spec.description {
        changes.description = Some(spec.description.clone());
    }
    if existing.tags != spec.tags {
        changes.tags = Some(spec.tags.clone());
    }
    if spec.subscription_label.is_some() && existing.subscription_label != spec.subscription_label
    {
        changes.subscription_label.clone_from(&spec.subscription_label);
    }
    if spec.subscription_url.is_some() && existing.subscription_url != spec.subscription_url {
        changes.subscription_url.clone_from(&spec.subscription_url);
    }
    changes
}

/// Lookup, then create or update. Counts the outcome into the summary.
pub async fn upsert_prefix(
    ctx: &mut RunContext<'_>,
    spec: &PrefixSpec,
) -> Result<PrefixOutcome, CoreError> {
    let existing = match ctx.inventory.find_prefixes(&spec.cidr).await {
        Ok(found) => found,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(cidr = %spec.cidr, error = %e, "prefix lookup failed, treating as not found");
            Vec::new()
        }
    };

    let outcome = match existing.as_slice() {
        [] => create(ctx, spec).await?,
        [only] => update(ctx, only, spec).await?,
        many if ctx.settings.strict_unique => {
            warn!(cidr = %spec.cidr, matches = many.len(), "ambiguous prefix, skipping (strict mode)");
            PrefixOutcome {
                action: PrefixAction::Skipped,
                prefix: None,
            }
        }
        many => {
            warn!(cidr = %spec.cidr, matches = many.len(), "ambiguous prefix, updating every match");
            update_all(ctx, many, spec).await?
        }
    };

    let counts = &mut ctx.summary.prefixes;
    match outcome.action {
        PrefixAction::Created => counts.created += 1,
        PrefixAction::Updated => counts.updated += 1,
        PrefixAction::Unchanged => counts.unchanged += 1,
        PrefixAction::Skipped => counts.skipped += 1,
        PrefixAction::Missing => counts.missing += 1,
    }
    Ok(outcome)
}

async fn create(ctx: &mut RunContext<'_>, spec: &PrefixSpec) -> Result<PrefixOutcome, CoreError> {
    match ctx.inventory.create_prefix(spec).await {
        Ok(created) => {
            let action = if ctx.settings.dry_run {
                PrefixAction::Missing
            } else {
                info!(cidr = %spec.cidr, id = created.id, "created prefix");
                PrefixAction::Created
            };
            Ok(PrefixOutcome {
                action,
                prefix: Some(created),
            })
        }
        Err(e) if e.is_conflict() => {
            // Created elsewhere since the lookup: converge on that record.
            debug!(cidr = %spec.cidr, "duplicate prefix on create, re-reading");
            let found = ctx.inventory.find_prefixes(&spec.cidr).await?;
            let existing = primary(found).ok_or(e)?;
            Ok(PrefixOutcome {
                action: PrefixAction::Unchanged,
                prefix: Some(existing),
            })
        }
        Err(e) => Err(e),
    }
}

async fn update(
    ctx: &mut RunContext<'_>,
    existing: &TargetPrefix,
    spec: &PrefixSpec,
) -> Result<PrefixOutcome, CoreError> {
    let changes = diff_prefix(existing, spec);
    if changes.is_empty() {
        debug!(cidr = %spec.cidr, id = existing.id, "prefix up to date");
        return Ok(PrefixOutcome {
            action: PrefixAction::Unchanged,
            prefix: Some(existing.clone()),
        });
    }

    let updated = ctx.inventory.update_prefix(existing, &changes).await?;
    info!(cidr = %spec.cidr, id = existing.id, fields = ?changes.fields(), "updated prefix");
    Ok(PrefixOutcome {
        action: PrefixAction::Updated,
        prefix: Some(updated),
    })
}

async fn update_all(
    ctx: &mut RunContext<'_>,
    existing: &[TargetPrefix],
    spec: &PrefixSpec,
) -> Result<PrefixOutcome, CoreError> {
    let mut any_updated = false;
    let mut records = Vec::with_capacity(existing.len());
    for record in existing {
        let outcome = update(ctx, record, spec).await?;
        any_updated |= outcome.action == PrefixAction::Updated;
        records.extend(outcome.prefix);
    }
    Ok(PrefixOutcome {
        action: if any_updated {
            PrefixAction::Updated
        } else {
            PrefixAction::Unchanged
        },
        prefix: primary(records),
    })
}

/// The record children link to when a CIDR matches several: the one in
/// the global table if present, else the lowest id.
fn primary(mut records: Vec<TargetPrefix>) -> Option<TargetPrefix> {
    records.sort_by_key(|p| (p.vrf.is_some(), p.id));
    records.into_iter().next()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::config::SyncSettings;
    use crate::testing::MemoryInventory;
    use pretty_assertions::assert_eq;

    fn spec(cidr: &str, parent: Option<u64>) -> PrefixSpec {
        PrefixSpec {
            cidr: cidr.parse().unwrap(),
            status: "active".into(),
            description: "Azure VNet: hub (Subscription: s1)".into(),
            tags: BTreeSet::from([1, 2]),
            parent,
            subscription_label: Some("contoso - s1".into()),
            subscription_url: None,
        }
    }

    #[tokio::test]
    async fn creates_when_absent() {
        let inventory = MemoryInventory::new();
        let settings = SyncSettings::default();
        let mut ctx = RunContext::new(&inventory, &settings);

        let outcome = upsert_prefix(&mut ctx, &spec("10.0.0.0/16", None))
            .await
            .unwrap();
        assert!(outcome.was_created());
        assert_eq!(ctx.summary.prefixes.created, 1);
        assert_eq!(inventory.prefixes().len(), 1);
    }

    #[tokio::test]
    async fn second_upsert_is_unchanged() {
        let inventory = MemoryInventory::new();
        let settings = SyncSettings::default();
        let mut ctx = RunContext::new(&inventory, &settings);

        upsert_prefix(&mut ctx, &spec("10.0.0.0/16", None)).await.unwrap();
        let again = upsert_prefix(&mut ctx, &spec("10.0.0.0/16", None)).await.unwrap();

        assert_eq!(again.action, PrefixAction::Unchanged);
        assert_eq!(inventory.creates(), 1);
    }

    #[tokio::test]
    async fn single_update_covers_all_changed_fields() {
        let inventory = MemoryInventory::new();
        let seeded = inventory.seed_prefix("10.0.0.0/16", None, "hand-made");
        let settings = SyncSettings::default();
        let mut ctx = RunContext::new(&inventory, &settings);

        let outcome = upsert_prefix(&mut ctx, &spec("10.0.0.0/16", None)).await.unwrap();

        assert_eq!(outcome.action, PrefixAction::Updated);
        let journal = inventory.journal();
        assert_eq!(journal, vec!["update_prefix 10.0.0.0/16".to_string()]);
        let stored = inventory.prefix("10.0.0.0/16").unwrap();
        assert_eq!(stored.id, seeded.id);
        assert_eq!(stored.tags, BTreeSet::from([1, 2]));
        assert_eq!(stored.subscription_label.as_deref(), Some("contoso - s1"));
    }

    #[tokio::test]
    async fn duplicate_on_create_converges_to_existing() {
        let inventory = MemoryInventory::new();
        let seeded = inventory.seed_prefix("10.0.0.0/16", None, "");
        inventory.fail_prefix_lookups(1);
        let settings = SyncSettings::default();
        let mut ctx = RunContext::new(&inventory, &settings);

        let outcome = upsert_prefix(&mut ctx, &spec("10.0.0.0/16", None)).await.unwrap();

        assert_eq!(outcome.prefix.unwrap().id, seeded.id);
        assert_eq!(inventory.prefixes().len(), 1);
        assert_eq!(inventory.creates(), 0);
    }

    #[tokio::test]
    async fn ambiguous_cidr_updates_all_by_default() {
        let inventory = MemoryInventory::new();
        let global = inventory.seed_prefix("10.0.0.0/16", None, "old");
        inventory.seed_prefix("10.0.0.0/16", Some(7), "old");
        let settings = SyncSettings::default();
        let mut ctx = RunContext::new(&inventory, &settings);

        let outcome = upsert_prefix(&mut ctx, &spec("10.0.0.0/16", None)).await.unwrap();

        assert_eq!(outcome.action, PrefixAction::Updated);
        assert_eq!(outcome.prefix.unwrap().id, global.id);
        assert!(inventory.prefixes().iter().all(|p| p.description.starts_with("Azure VNet")));
        // Scopes are kept apart.
        assert_eq!(inventory.prefixes().iter().filter(|p| p.vrf == Some(7)).count(), 1);
    }

    #[tokio::test]
    async fn ambiguous_cidr_skipped_in_strict_mode() {
        let inventory = MemoryInventory::new();
        inventory.seed_prefix("10.0.0.0/16", None, "old");
        inventory.seed_prefix("10.0.0.0/16", Some(7), "old");
        let settings = SyncSettings {
            strict_unique: true,
            ..SyncSettings::default()
        };
        let mut ctx = RunContext::new(&inventory, &settings);

        let outcome = upsert_prefix(&mut ctx, &spec("10.0.0.0/16", None)).await.unwrap();

        assert_eq!(outcome.action, PrefixAction::Skipped);
        assert!(outcome.prefix.is_none());
        assert_eq!(ctx.summary.prefixes.skipped, 1);
        assert!(inventory.journal().is_empty());
    }

    #[test]
    fn diff_ignores_unsupplied_enrichment() {
        let existing = TargetPrefix {
            id: 1,
            cidr: "10.0.1.0/24".parse().unwrap(),
            vrf: None,
            status: "active".into(),
            description: "d".into(),
            tags: BTreeSet::from([1]),
            parent: Some(9),
            subscription_label: Some("x".into()),
            subscription_url: None,
        };
        let desired = PrefixSpec {
            cidr: existing.cidr,
            status: "active".into(),
            description: "d".into(),
            tags: BTreeSet::from([1]),
            parent: None,
            subscription_label: None,
            subscription_url: None,
        };
        assert!(diff_prefix(&existing, &desired).is_empty());
    }

    #[test]
    fn diff_never_reports_parent_link() {
        // Records read back from NetBox carry no parent.
        let existing = TargetPrefix {
            id: 32,
            cidr: "10.0.1.0/24".parse().unwrap(),
            vrf: None,
            status: "active".into(),
            description: "d".into(),
            tags: BTreeSet::from([1]),
            parent: None,
            subscription_label: None,
            subscription_url: None,
        };
        let desired = PrefixSpec {
            cidr: existing.cidr,
            status: "active".into(),
            description: "d".into(),
            tags: BTreeSet::from([1]),
            parent: Some(31),
            subscription_label: None,
            subscription_url: None,
        };
        assert!(diff_prefix(&existing, &desired).is_empty());
    }
}
