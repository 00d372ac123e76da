//! Configuration for vnetbox.
//!
//! A YAML (or TOML) file merged with `VNETBOX_*` environment overrides,
//! NetBox token resolution (flag + env + keyring + plaintext), and
//! translation to `vnetbox_core::{ConnectionConfig, SyncSettings}`.
//! The CLI applies its own flag overrides on top of what this returns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml, Yaml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use vnetbox_core::device::MIN_NAME_LENGTH;
use vnetbox_core::{
    ConnectionConfig, CustomFieldSettings, FilterConfig, FilterSet, MappingSettings,
    SubscriptionSelection, SyncSettings, TagSettings, TlsVerification,
};

/// Keyring service name; entries are keyed `{netbox-host}/token`.
pub const KEYRING_SERVICE: &str = "vnetbox";

/// Environment prefix; `__` separates nested keys
/// (`VNETBOX_NETBOX__URL`, `VNETBOX_SYNC__DRY_RUN`).
pub const ENV_PREFIX: &str = "VNETBOX_";

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no NetBox token found (checked --token, ${env}, keyring, and netbox.token)")]
    NoCredentials { env: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(String),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── File structs ────────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub netbox: NetboxSection,
    pub azure: AzureSection,
    pub mapping: MappingSettings,
    pub tags: TagsSection,
    pub custom_fields: CustomFieldSettings,
    pub filters: FilterConfig,
    pub ssl: SslSection,
    pub timeouts: TimeoutsSection,
    pub sync: SyncSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetboxSection {
    /// Base URL, e.g. "https://netbox.example.com".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// API token (plaintext, prefer the env var or keyring).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Name of the environment variable holding the token.
    pub token_env: String,

    /// Custom CA certificate for the NetBox endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for NetboxSection {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            token_env: "NETBOX_TOKEN".into(),
            ca_cert: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AzureSection {
    pub subscriptions: SubscriptionsSection,
}

/// Set exactly one of these. When several are set, `process_all` wins
/// over `specific_id`, which wins over `management_group`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SubscriptionsSection {
    pub process_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_group: Option<ManagementGroupRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagementGroupRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TagsSection {
    pub sync_tag: SyncTag,
    /// Slugs of extra tags attached to everything a run touches.
    pub additional_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncTag {
    pub name: String,
    pub description: String,
}

impl Default for SyncTag {
    fn default() -> Self {
        let defaults = TagSettings::default();
        Self {
            name: defaults.sync_tag_name,
            description: defaults.sync_tag_description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SslSection {
    pub verify: bool,
}

impl Default for SslSection {
    fn default() -> Self {
        Self { verify: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// Per-request timeout against NetBox, in seconds.
    pub netbox_api: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self { netbox_api: 30 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSection {
    /// Skip CIDRs that already match several prefixes.
    pub strict_unique: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` and `-v` are absent.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Default config file location via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "vnetbox", "vnetbox").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.yaml");
            p
        },
        |dirs| dirs.config_dir().join("config.yaml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vnetbox");
    p
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then `path` (TOML by extension, YAML otherwise; a missing
/// file contributes nothing), then `VNETBOX_*` environment.
pub fn figment(path: &Path) -> Figment {
    let base = Figment::new().merge(Serialized::defaults(Config::default()));
    let with_file = if is_toml(path) {
        base.merge(Toml::file(path))
    } else {
        base.merge(Yaml::file(path))
    };
    with_file.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load configuration. An explicit `path` must exist; the default
/// location may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => config_path(),
    };
    debug!(path = %path.display(), "loading config");

    let config: Config = figment(&path).extract()?;
    Ok(config)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Static checks that need neither network nor secrets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.netbox_url()?;
        if self.mapping.max_name_length < MIN_NAME_LENGTH {
            return Err(ConfigError::invalid(
                "mapping.max_name_length",
                format!(
                    "must be at least {MIN_NAME_LENGTH}, got {}",
                    self.mapping.max_name_length
                ),
            ));
        }
        FilterSet::compile(&self.filters)
            .map_err(|e| ConfigError::invalid("filters.resource_names", e.to_string()))?;
        self.subscription_selection()?;
        Ok(())
    }

    pub fn netbox_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .netbox
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::invalid("netbox.url", "missing"))?;
        let url: Url = raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid("netbox.url", format!("{raw}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::invalid(
                "netbox.url",
                format!("unsupported scheme '{other}'"),
            )),
        }
    }

    pub fn subscription_selection(&self) -> Result<SubscriptionSelection, ConfigError> {
        let subs = &self.azure.subscriptions;
        let group = subs
            .management_group
            .as_ref()
            .filter(|g| g.id.is_some() || g.name.is_some());
        let configured =
            usize::from(subs.process_all) + usize::from(subs.specific_id.is_some()) + usize::from(group.is_some());
        if configured > 1 {
            warn!("several subscription selections configured, using the highest priority one");
        }

        if subs.process_all {
            return Ok(SubscriptionSelection::All);
        }
        if let Some(ref id) = subs.specific_id {
            return Ok(SubscriptionSelection::Specific(id.clone()));
        }
        if let Some(group) = group {
            return Ok(SubscriptionSelection::ManagementGroup {
                id: group.id.clone(),
                name: group.name.clone(),
            });
        }
        Err(ConfigError::invalid(
            "azure.subscriptions",
            "set one of process_all, specific_id, or management_group",
        ))
    }

    /// Token chain: `flag`, then the env var named by `netbox.token_env`,
    /// then the OS keyring, then plaintext `netbox.token`.
    pub fn resolve_token(&self, flag: Option<&str>) -> Result<SecretString, ConfigError> {
        // 1. CLI flag
        if let Some(token) = flag.filter(|t| !t.is_empty()) {
            return Ok(SecretString::from(token.to_owned()));
        }

        // 2. Env var
        if let Ok(val) = std::env::var(&self.netbox.token_env) {
            if !val.is_empty() {
                return Ok(SecretString::from(val));
            }
        }

        // 3. System keyring
        let host = self
            .netbox_url()
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .unwrap_or_else(|| "default".into());
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{host}/token")) {
            if let Ok(secret) = entry.get_password() {
                return Ok(SecretString::from(secret));
            }
        }

        // 4. Plaintext in config
        if let Some(ref token) = self.netbox.token {
            return Ok(SecretString::from(token.clone()));
        }

        Err(ConfigError::NoCredentials {
            env: self.netbox.token_env.clone(),
        })
    }

    /// The single place file settings cross into core connection types.
    pub fn connection_config(&self, token_flag: Option<&str>) -> Result<ConnectionConfig, ConfigError> {
        let url = self.netbox_url()?;
        let token = self.resolve_token(token_flag)?;

        let tls = if !self.ssl.verify {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.netbox.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(ConnectionConfig {
            url,
            token,
            tls,
            timeout: Duration::from_secs(self.timeouts.netbox_api),
        })
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            mapping: self.mapping.clone(),
            tags: TagSettings {
                sync_tag_name: self.tags.sync_tag.name.clone(),
                sync_tag_description: self.tags.sync_tag.description.clone(),
                additional: self.tags.additional_tags.clone(),
            },
            custom_fields: self.custom_fields.clone(),
            filters: self.filters.clone(),
            strict_unique: self.sync.strict_unique,
            dry_run: self.sync.dry_run,
        }
    }

    /// Copy safe to print: the plaintext token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.netbox.token.is_some() {
            copy.netbox.token = Some(REDACTED.into());
        }
        copy
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const MINIMAL: &str = r"
netbox:
  url: https://netbox.example.com
azure:
  subscriptions:
    process_all: true
";

    fn minimal() -> Config {
        let mut config = Config::default();
        config.netbox.url = Some("https://netbox.example.com".into());
        config.azure.subscriptions.process_all = true;
        config
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config: Config = figment(Path::new("absent.yaml")).extract()?;
            assert_eq!(config, Config::default());
            assert_eq!(config.mapping.max_name_length, 64);
            assert_eq!(config.netbox.token_env, "NETBOX_TOKEN");
            assert!(config.ssl.verify);
            Ok(())
        });
    }

    #[test]
    fn yaml_file_then_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "vnetbox.yaml",
                r"
netbox:
  url: https://netbox.example.com
azure:
  subscriptions:
    specific_id: 00000000-0000-0000-0000-000000000001
mapping:
  max_name_length: 32
filters:
  regions:
    include: [westeurope]
",
            )?;
            jail.set_env("VNETBOX_SYNC__DRY_RUN", "true");
            jail.set_env("VNETBOX_NETBOX__URL", "https://ipam.internal");

            let config = load_config(Some(Path::new("vnetbox.yaml"))).unwrap();
            assert_eq!(config.netbox.url.as_deref(), Some("https://ipam.internal"));
            assert_eq!(config.mapping.max_name_length, 32);
            assert_eq!(config.mapping.site_prefix, "Azure-");
            assert!(config.sync.dry_run);
            assert_eq!(config.filters.regions.include, vec!["westeurope".to_string()]);
            assert_eq!(
                config.subscription_selection().unwrap(),
                SubscriptionSelection::Specific("00000000-0000-0000-0000-000000000001".into())
            );
            Ok(())
        });
    }

    #[test]
    fn toml_selected_by_extension() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "vnetbox.toml",
                r#"
[netbox]
url = "https://netbox.example.com"

[azure.subscriptions.management_group]
name = "Platform"

[logging]
format = "json"
"#,
            )?;
            let config = load_config(Some(Path::new("vnetbox.toml"))).unwrap();
            assert_eq!(config.logging.format, LogFormat::Json);
            assert_eq!(
                config.subscription_selection().unwrap(),
                SubscriptionSelection::ManagementGroup {
                    id: None,
                    name: Some("Platform".into()),
                }
            );
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_path_is_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/vnetbox.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn process_all_has_priority() {
        let mut config = minimal();
        config.azure.subscriptions.specific_id = Some("abc".into());
        assert_eq!(config.subscription_selection().unwrap(), SubscriptionSelection::All);
    }

    #[test]
    fn validation_failures() {
        assert!(minimal().validate().is_ok());

        let mut no_url = minimal();
        no_url.netbox.url = None;
        assert!(matches!(
            no_url.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "netbox.url"
        ));

        let mut ftp = minimal();
        ftp.netbox.url = Some("ftp://netbox.example.com".into());
        assert!(ftp.validate().is_err());

        let mut short = minimal();
        short.mapping.max_name_length = 4;
        assert!(short.validate().is_err());
        short.mapping.max_name_length = 5;
        assert!(short.validate().is_ok());

        let mut bad_regex = minimal();
        bad_regex.filters.resource_names.include_patterns = vec!["(unclosed".into()];
        assert!(bad_regex.validate().is_err());

        let mut no_selection = minimal();
        no_selection.azure.subscriptions.process_all = false;
        no_selection.azure.subscriptions.management_group = Some(ManagementGroupRef::default());
        assert!(matches!(
            no_selection.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "azure.subscriptions"
        ));
    }

    #[test]
    fn token_flag_wins_over_env() {
        Jail::expect_with(|jail| {
            jail.set_env("NETBOX_TOKEN", "from-env");
            let token = minimal().resolve_token(Some("from-flag")).unwrap();
            assert_eq!(token.expose_secret(), "from-flag");
            Ok(())
        });
    }

    #[test]
    fn token_env_name_is_configurable() {
        Jail::expect_with(|jail| {
            jail.set_env("IPAM_TOKEN", "from-custom-env");
            let mut config = minimal();
            config.netbox.token_env = "IPAM_TOKEN".into();
            config.netbox.token = Some("plaintext".into());
            let token = config.resolve_token(None).unwrap();
            assert_eq!(token.expose_secret(), "from-custom-env");
            Ok(())
        });
    }

    #[test]
    fn connection_config_maps_tls_and_timeout() {
        let mut config = minimal();
        config.ssl.verify = false;
        config.timeouts.netbox_api = 5;
        let conn = config.connection_config(Some("t0ken")).unwrap();
        assert_eq!(conn.url.as_str(), "https://netbox.example.com/");
        assert_eq!(conn.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(conn.timeout, Duration::from_secs(5));
    }

    #[test]
    fn sync_settings_carry_file_values() {
        let mut config = minimal();
        config.tags.additional_tags = vec!["core-network".into()];
        config.sync.strict_unique = true;
        let settings = config.sync_settings();
        assert_eq!(settings.tags.sync_tag_name, "azure-sync");
        assert_eq!(settings.tags.additional, vec!["core-network".to_string()]);
        assert!(settings.strict_unique);
        assert!(!settings.dry_run);
    }

    #[test]
    fn redacted_masks_plaintext_token() {
        let mut config = minimal();
        config.netbox.token = Some("secret".into());
        let shown = config.redacted().to_yaml().unwrap();
        assert!(shown.contains(REDACTED));
        assert!(!shown.contains("secret"));
    }

    #[test]
    fn minimal_yaml_round_trips_through_figment() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", MINIMAL)?;
            let config = load_config(Some(Path::new("config.yaml"))).unwrap();
            assert_eq!(config, minimal());
            Ok(())
        });
    }
}
