// ── Device reconciler ──
//
// Upserts device, interface and address records for one discovered
// endpoint. Type, role and site are resolved first; the device name is
// derived, claimed (suffixing on collision), then the default interface
// and the host address are brought in line.

use std::collections::BTreeSet;
use std::net::IpAddr;

use ipnet::IpNet;
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::error::CoreError;
use crate::inventory::{AddressSpec, DeviceSpec, InterfaceSpec, RefKind, RefSpec};
use crate::model::{
    DeviceKind, DiscoveredDevice, ObjectRef, TargetAddress, TargetDevice, TargetInterface,
};
use crate::naming::{slugify, suffixed_name, truncate_name};

/// Upper bound on `-N` suffixes tried before giving up on a name.
pub const MAX_NAME_SUFFIX: u32 = 100;

/// Shortest usable `mapping.max_name_length`: one character of the base
/// name plus the widest suffix, `-100`.
pub const MIN_NAME_LENGTH: usize = 5;

/// Where a device sits, as seen by the reconciler.
#[derive(Debug, Clone, Copy)]
pub struct SubnetContext<'a> {
    pub network: &'a str,
    pub subnet: &'a str,
    /// Tag ids attached to every record created for this device.
    pub tags: &'a BTreeSet<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressAction {
    Created,
    Reassigned,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct DeviceOutcome {
    pub device: TargetDevice,
    pub device_created: bool,
    /// Final name differs from the derived one (collision suffix).
    pub renamed: bool,
    pub interface: TargetInterface,
    pub interface_created: bool,
    pub address: TargetAddress,
    pub address_action: AddressAction,
}

pub async fn upsert_device(
    ctx: &mut RunContext<'_>,
    subnet: &SubnetContext<'_>,
    device: &DiscoveredDevice,
) -> Result<DeviceOutcome, CoreError> {
    let ip = device.private_ip.ok_or_else(|| {
        CoreError::validation(format!("device {}", device.name), "no private IP address")
    })?;

    let device_type = resolve_device_type(ctx, device.kind).await?;
    let role = resolve_device_role(ctx, device.kind).await?;
    let site = resolve_site(ctx, &device.region).await?;

    let base = truncate_name(&device.name, ctx.settings.mapping.max_name_length);
    let spec = DeviceSpec {
        name: base.clone(),
        device_type: device_type.id,
        role: role.id,
        site: site.id,
        external_id: device.id.clone(),
        tags: subnet.tags.clone(),
    };
    let (target, device_created) = claim_device(ctx, &spec).await?;
    let renamed = target.name != base;

    let (interface, interface_created) = ensure_interface(ctx, &target, device, subnet.tags).await?;
    let (address, address_action) = ensure_address(ctx, ip, &interface, device, subnet.tags).await?;

    debug!(
        device = %target.name,
        network = subnet.network,
        subnet = subnet.subnet,
        "device reconciled"
    );

    let summary = &mut ctx.summary;
    if device_created {
        summary.devices.created += 1;
    } else {
        summary.devices.unchanged += 1;
    }
    if interface_created {
        summary.interfaces.created += 1;
    } else {
        summary.interfaces.unchanged += 1;
    }
    match address_action {
        AddressAction::Created => summary.addresses.created += 1,
        AddressAction::Reassigned => summary.addresses.updated += 1,
        AddressAction::Unchanged => summary.addresses.unchanged += 1,
    }

    Ok(DeviceOutcome {
        device: target,
        device_created,
        renamed,
        interface,
        interface_created,
        address,
        address_action,
    })
}

// ── Dependencies ─────────────────────────────────────────────────────

/// Sync tag only; reference objects are shared across networks.
fn sync_tag_ids(ctx: &RunContext<'_>) -> BTreeSet<u64> {
    let slug = slugify(&ctx.settings.tags.sync_tag_name);
    ctx.cached_ref(RefKind::Tag, &slug)
        .map(|t| t.id)
        .into_iter()
        .collect()
}

async fn resolve_device_type(
    ctx: &mut RunContext<'_>,
    kind: DeviceKind,
) -> Result<ObjectRef, CoreError> {
    let settings = ctx.settings;
    let mapping = &settings.mapping;
    let model = format!("{} {}", mapping.device_type_prefix, kind.label());
    let slug = slugify(&model);

    if let Some(found) = ctx.lookup_ref(RefKind::DeviceType, &slug).await? {
        return Ok(found);
    }

    let manufacturer_name = mapping.manufacturer.clone();
    let manufacturer = ctx
        .resolve_ref(&RefSpec::Manufacturer {
            slug: slugify(&manufacturer_name),
            name: manufacturer_name,
            description: "Created by Azure sync".into(),
        })
        .await?;

    let tags = sync_tag_ids(ctx);
    ctx.create_ref(&RefSpec::DeviceType {
        model,
        slug,
        manufacturer: manufacturer.id,
        tags,
    })
    .await
}

async fn resolve_device_role(
    ctx: &mut RunContext<'_>,
    kind: DeviceKind,
) -> Result<ObjectRef, CoreError> {
    let name = format!(
        "{} {}",
        ctx.settings.mapping.device_role_prefix,
        kind.label()
    );
    let spec = RefSpec::DeviceRole {
        slug: slugify(&name),
        name,
        vm_role: kind.is_virtual_machine(),
        tags: sync_tag_ids(ctx),
    };
    ctx.resolve_ref(&spec).await
}

async fn resolve_site(ctx: &mut RunContext<'_>, region: &str) -> Result<ObjectRef, CoreError> {
    let name = format!("{}{region}", ctx.settings.mapping.site_prefix);
    let spec = RefSpec::Site {
        slug: slugify(&name),
        name,
        description: format!("Azure Region: {region}"),
        tags: sync_tag_ids(ctx),
    };
    ctx.resolve_ref(&spec).await
}

// ── Device ───────────────────────────────────────────────────────────

/// Find or create the device, stepping through `-1`, `-2`, ... when the
/// name at this site belongs to a different resource.
async fn claim_device(
    ctx: &mut RunContext<'_>,
    spec: &DeviceSpec,
) -> Result<(TargetDevice, bool), CoreError> {
    let max_len = ctx.settings.mapping.max_name_length;
    let base = spec.name.clone();

    let mut tried = 0;
    for attempt in 0..=MAX_NAME_SUFFIX {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            match suffixed_name(&base, attempt, max_len) {
                Some(name) => name,
                None => break,
            }
        };
        tried = attempt;

        if let Some(existing) = find_device(ctx, &candidate, spec.site).await? {
            if ctx.may_claim(&existing, &spec.external_id) {
                debug!(device = %candidate, id = existing.id, "reusing existing device");
                ctx.claim(&existing, &spec.external_id);
                return Ok((existing, false));
            }
            debug!(device = %candidate, "name taken by another resource");
            continue;
        }

        let attempt_spec = DeviceSpec {
            name: candidate.clone(),
            ..spec.clone()
        };
        match ctx.inventory.create_device(&attempt_spec).await {
            Ok(created) => {
                if attempt > 0 {
                    warn!(device = %base, renamed = %candidate, "device name collision, using suffixed name");
                }
                info!(device = %candidate, id = created.id, "created device");
                ctx.claim(&created, &spec.external_id);
                return Ok((created, true));
            }
            Err(e) if e.is_conflict() => {
                // Lost a race or the lookup failed: re-read once before moving on.
                let winner = find_device(ctx, &candidate, spec.site).await?;
                if let Some(existing) = winner.filter(|d| ctx.may_claim(d, &spec.external_id)) {
                    ctx.claim(&existing, &spec.external_id);
                    return Ok((existing, false));
                }
                debug!(device = %candidate, "name conflict on create, trying next suffix");
            }
            Err(e) => return Err(e),
        }
    }

    Err(CoreError::SuffixExhausted {
        base,
        attempts: tried,
    })
}

async fn find_device(
    ctx: &RunContext<'_>,
    name: &str,
    site: u64,
) -> Result<Option<TargetDevice>, CoreError> {
    match ctx.inventory.find_device(name, site).await {
        Ok(found) => Ok(found),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(device = name, error = %e, "device lookup failed, treating as not found");
            Ok(None)
        }
    }
}

// ── Interface ────────────────────────────────────────────────────────

async fn ensure_interface(
    ctx: &RunContext<'_>,
    target: &TargetDevice,
    device: &DiscoveredDevice,
    tags: &BTreeSet<u64>,
) -> Result<(TargetInterface, bool), CoreError> {
    let name = ctx.settings.mapping.default_interface.clone();

    match ctx.inventory.find_interface(target.id, &name).await {
        Ok(Some(found)) => return Ok((found, false)),
        Ok(None) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => warn!(device = %target.name, error = %e, "interface lookup failed, treating as not found"),
    }

    let spec = InterfaceSpec {
        device: target.id,
        name,
        mac_address: device.mac_address.clone(),
        tags: tags.clone(),
    };
    match ctx.inventory.create_interface(&spec).await {
        Ok(created) => {
            debug!(device = %target.name, interface = %created.name, "created interface");
            Ok((created, true))
        }
        Err(e) if e.is_conflict() => {
            let existing = ctx
                .inventory
                .find_interface(target.id, &spec.name)
                .await?
                .ok_or(e)?;
            Ok((existing, false))
        }
        Err(e) => Err(e),
    }
}

// ── Address ──────────────────────────────────────────────────────────

/// Host network for a single IP: /32 for v4, /128 for v6.
pub fn host_network(ip: IpAddr) -> Result<IpNet, CoreError> {
    let bits = match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNet::new(ip, bits).map_err(|e| CoreError::Internal(format!("host mask for {ip}: {e}")))
}

async fn ensure_address(
    ctx: &RunContext<'_>,
    ip: IpAddr,
    interface: &TargetInterface,
    device: &DiscoveredDevice,
    tags: &BTreeSet<u64>,
) -> Result<(TargetAddress, AddressAction), CoreError> {
    let address = host_network(ip)?;

    let existing = match ctx.inventory.find_addresses(&address).await {
        Ok(found) => found,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(%address, error = %e, "address lookup failed, treating as not found");
            Vec::new()
        }
    };

    let (keep, duplicates) = pick_address(existing, interface.id);
    if !duplicates.is_empty() {
        warn!(%address, matches = duplicates.len() + 1, "address recorded more than once, detaching extras");
    }
    for extra in duplicates.iter().filter(|a| a.interface.is_some()) {
        info!(%address, id = extra.id, from = ?extra.interface, "detaching duplicate address");
        ctx.inventory.unassign_address(extra).await?;
    }

    match keep {
        Some(found) if found.interface == Some(interface.id) => {
            Ok((found, AddressAction::Unchanged))
        }
        Some(found) => {
            info!(
                %address,
                from = ?found.interface,
                to = interface.id,
                "moving address to current interface"
            );
            let moved = ctx.inventory.assign_address(&found, interface.id).await?;
            Ok((moved, AddressAction::Reassigned))
        }
        None => {
            let spec = AddressSpec {
                address,
                description: format!("IP for {}", device.name),
                interface: interface.id,
                tags: tags.clone(),
            };
            let created = ctx.inventory.create_address(&spec).await?;
            debug!(%address, "created address");
            Ok((created, AddressAction::Created))
        }
    }
}

/// The record to keep for an address: the one already on `interface`,
/// else the lowest id. The rest are returned as duplicates.
fn pick_address(
    mut records: Vec<TargetAddress>,
    interface: u64,
) -> (Option<TargetAddress>, Vec<TargetAddress>) {
    records.sort_by_key(|a| (a.interface != Some(interface), a.id));
    let mut records = records.into_iter();
    let keep = records.next();
    (keep, records.collect())
}
