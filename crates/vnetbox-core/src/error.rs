// ── Core error types ──
//
// Reconciliation-level errors. Consumers never see HTTP status codes or
// JSON parse failures directly; the `From<vnetbox_api::Error>` impl
// translates transport-layer errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to NetBox at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("NetBox request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Inventory errors ─────────────────────────────────────────────
    /// A create was refused because the natural key already exists.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Lookup of {entity} '{key}' failed: {message}")]
    Lookup {
        entity: String,
        key: String,
        message: String,
    },

    #[error("Every name candidate for '{base}' is taken ({attempts} attempts)")]
    SuffixExhausted { base: String, attempts: u32 },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Data errors ──────────────────────────────────────────────────
    /// A discovered record is unusable (no address prefix, no IP, bad
    /// CIDR). The unit is skipped, never fatal.
    #[error("Skipped {unit}: {reason}")]
    Validation { unit: String, reason: String },

    #[error("Discovery failed: {message}")]
    Discovery { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Errors that abort the whole run instead of a single unit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::AuthenticationFailed { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Lookup-side failures that a caller may treat as "not found".
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::Lookup { .. }
                | Self::Timeout { .. }
                | Self::ConnectionFailed { .. }
                | Self::Api { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub(crate) fn validation(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vnetbox_api::Error> for CoreError {
    fn from(err: vnetbox_api::Error) -> Self {
        if err.is_uniqueness_conflict() {
            return CoreError::Conflict {
                message: err.to_string(),
            };
        }

        match err {
            vnetbox_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            vnetbox_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            vnetbox_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid NetBox URL: {e}"),
            },
            vnetbox_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            vnetbox_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            vnetbox_api::Error::Api {
                status, message, ..
            } => CoreError::Api {
                message,
                status: Some(status),
            },
            vnetbox_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
