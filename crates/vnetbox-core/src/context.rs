// ── Per-run context ──
//
// Carries the inventory handle, settings, the lookup-or-create caches and
// the summary accumulator through every reconciler call. Created at the
// start of a run and dropped at the end.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::SyncSettings;
use crate::error::CoreError;
use crate::inventory::{Inventory, RefKind, RefSpec};
use crate::model::{ObjectRef, TargetDevice};
use crate::summary::RunSummary;

pub struct RunContext<'a> {
    pub inventory: &'a dyn Inventory,
    pub settings: &'a SyncSettings,
    pub summary: RunSummary,
    refs: HashMap<(RefKind, String), ObjectRef>,
    /// Device id -> cloud resource id of the device that claimed it this run.
    claimed: HashMap<u64, String>,
    ref_round_trips: usize,
}

impl<'a> RunContext<'a> {
    pub fn new(inventory: &'a dyn Inventory, settings: &'a SyncSettings) -> Self {
        Self {
            inventory,
            settings,
            summary: RunSummary::new(settings.dry_run),
            refs: HashMap::new(),
            claimed: HashMap::new(),
            ref_round_trips: 0,
        }
    }

    // ── Reference objects ────────────────────────────────────────────

    pub fn cached_ref(&self, kind: RefKind, slug: &str) -> Option<&ObjectRef> {
        self.refs.get(&(kind, slug.to_owned()))
    }

    fn remember(&mut self, kind: RefKind, resolved: &ObjectRef) {
        self.refs
            .insert((kind, resolved.slug.clone()), resolved.clone());
    }

    /// Number of distinct slugs that needed an inventory round trip.
    pub fn ref_round_trips(&self) -> usize {
        self.ref_round_trips
    }

    /// Look up a reference object. A failed read is reported as absent;
    /// fatal errors still propagate.
    pub async fn lookup_ref(
        &mut self,
        kind: RefKind,
        slug: &str,
    ) -> Result<Option<ObjectRef>, CoreError> {
        if let Some(hit) = self.cached_ref(kind, slug) {
            return Ok(Some(hit.clone()));
        }
        self.ref_round_trips += 1;
        match self.inventory.find_ref(kind, slug).await {
            Ok(Some(found)) => {
                self.remember(kind, &found);
                Ok(Some(found))
            }
            Ok(None) => Ok(None),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(%kind, slug, error = %e, "lookup failed, treating as not found");
                Ok(None)
            }
        }
    }

    /// Create a reference object. A uniqueness conflict means someone else
    /// created it first; the existing record is fetched and used.
    pub async fn create_ref(&mut self, spec: &RefSpec) -> Result<ObjectRef, CoreError> {
        let kind = spec.kind();
        let created = match self.inventory.create_ref(spec).await {
            Ok(created) => {
                info!(%kind, slug = spec.slug(), name = spec.name(), "created");
                created
            }
            Err(e) if e.is_conflict() => {
                debug!(%kind, slug = spec.slug(), "already exists, re-reading");
                self.inventory
                    .find_ref(kind, spec.slug())
                    .await?
                    .ok_or(e)?
            }
            Err(e) => return Err(e),
        };
        self.remember(kind, &created);
        Ok(created)
    }

    /// Lookup-or-create, memoized per `(kind, slug)` for the run.
    pub async fn resolve_ref(&mut self, spec: &RefSpec) -> Result<ObjectRef, CoreError> {
        match self.lookup_ref(spec.kind(), spec.slug()).await? {
            Some(found) => Ok(found),
            None => self.create_ref(spec).await,
        }
    }

    // ── Device claims ────────────────────────────────────────────────

    /// Whether `device` may stand for the discovered resource `external_id`.
    ///
    /// A device already claimed this run belongs to whoever claimed it.
    /// Otherwise a recorded identity marker must match; a device without
    /// one is taken as-is.
    pub fn may_claim(&self, device: &TargetDevice, external_id: &str) -> bool {
        if let Some(owner) = self.claimed.get(&device.id) {
            return owner == external_id;
        }
        match device.external_id.as_deref() {
            Some(marker) => marker.eq_ignore_ascii_case(external_id),
            None => true,
        }
    }

    pub fn claim(&mut self, device: &TargetDevice, external_id: &str) {
        self.claimed.insert(device.id, external_id.to_owned());
    }
}
