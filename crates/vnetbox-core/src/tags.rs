// ── Tag resolver ──
//
// Maps logical tag intents to tag records, creating missing ones. Caching
// and conflict recovery live in `RunContext::resolve_ref`.

use std::collections::BTreeSet;

use crate::classify::EnvironmentLabel;
use crate::context::RunContext;
use crate::error::CoreError;
use crate::inventory::RefSpec;
use crate::model::ObjectRef;
use crate::naming::{capitalize, slugify};

/// Why a tag is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagIntent {
    /// Marker applied to every record the run touches.
    Sync { name: String, description: String },
    Environment(EnvironmentLabel),
    /// Cloud region, e.g. `westeurope` or `West Europe`.
    Region(String),
    /// User-configured slug.
    Additional(String),
}

impl TagIntent {
    pub fn to_spec(&self) -> RefSpec {
        match self {
            Self::Sync { name, description } => RefSpec::Tag {
                name: name.clone(),
                slug: slugify(name),
                description: description.clone(),
            },
            Self::Environment(label) => RefSpec::Tag {
                name: label.to_string(),
                slug: label.slug().to_owned(),
                description: format!("Environment: {label}"),
            },
            Self::Region(region) => {
                let slug = region.to_lowercase().replace(' ', "");
                RefSpec::Tag {
                    name: capitalize(&slug),
                    slug,
                    description: format!("Azure region: {region}"),
                }
            }
            Self::Additional(slug) => RefSpec::Tag {
                name: capitalize(slug),
                slug: slug.clone(),
                description: format!("Additional tag: {slug}"),
            },
        }
    }
}

pub async fn resolve(ctx: &mut RunContext<'_>, intent: &TagIntent) -> Result<ObjectRef, CoreError> {
    ctx.resolve_ref(&intent.to_spec()).await
}

/// The sync tag plus configured extras, as ids.
pub async fn base_tags(ctx: &mut RunContext<'_>) -> Result<BTreeSet<u64>, CoreError> {
    let settings = ctx.settings;
    let mut ids = BTreeSet::new();

    let sync = TagIntent::Sync {
        name: settings.tags.sync_tag_name.clone(),
        description: settings.tags.sync_tag_description.clone(),
    };
    ids.insert(resolve(ctx, &sync).await?.id);

    for slug in &settings.tags.additional {
        let tag = resolve(ctx, &TagIntent::Additional(slug.clone())).await?;
        ids.insert(tag.id);
    }
    Ok(ids)
}
