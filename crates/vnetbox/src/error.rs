//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use vnetbox_config::ConfigError;
use vnetbox_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// The run finished but some units failed.
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to NetBox at {url}")]
    #[diagnostic(
        code(vnetbox::connection_failed),
        help(
            "Check that NetBox is running and reachable: {reason}\n\
             Self-signed certificate? Set ssl.verify: false or pass --insecure (-k)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(vnetbox::timeout),
        help("Increase timeouts.netbox_api or pass --timeout.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("NetBox rejected the token: {message}")]
    #[diagnostic(
        code(vnetbox::auth_failed),
        help("Check that the token exists and has write permission on ipam and dcim.")
    )]
    AuthFailed { message: String },

    #[error("No NetBox token configured")]
    #[diagnostic(
        code(vnetbox::no_credentials),
        help(
            "Pass --token, export ${env}, store it in the OS keyring\n\
             (service 'vnetbox', account '<netbox-host>/token'), or set netbox.token."
        )
    )]
    NoCredentials { env: String },

    // ── Files ────────────────────────────────────────────────────────
    #[error("Configuration file not found: {}", path.display())]
    #[diagnostic(
        code(vnetbox::no_config),
        help("Run `vnetbox config path` to see the default location.")
    )]
    NoConfig { path: PathBuf },

    #[error("Snapshot file not found: {}", path.display())]
    #[diagnostic(code(vnetbox::no_snapshot))]
    NoSnapshot { path: PathBuf },

    // ── Validation / config ──────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vnetbox::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(vnetbox::config))]
    Config(Box<figment::Error>),

    // ── Run ──────────────────────────────────────────────────────────
    #[error("Discovery failed: {message}")]
    #[diagnostic(code(vnetbox::discovery))]
    Discovery { message: String },

    #[error("NetBox API error: {message}")]
    #[diagnostic(code(vnetbox::api_error))]
    Api { message: String },

    #[error("Run finished with {failed} failed unit(s)")]
    #[diagnostic(
        code(vnetbox::partial_failure),
        help("See the error list above; rerun to retry, completed work is not repeated.")
    )]
    PartialFailure { failed: usize },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error("Could not render output: {0}")]
    #[diagnostic(code(vnetbox::render))]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NoConfig { .. } | Self::NoSnapshot { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError ───────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { env } => Self::NoCredentials { env },
            ConfigError::NotFound { path } => Self::NoConfig { path },
            ConfigError::Serialization(message) => Self::Render(message),
            ConfigError::Figment(err) => Self::Config(err),
        }
    }
}

// ── CoreError → CliError ─────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Discovery { message } => Self::Discovery { message },
            other => Self::Api {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let auth: CliError = CoreError::AuthenticationFailed {
            message: "Invalid token".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let missing: CliError = ConfigError::NotFound {
            path: "/nope.yaml".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let bad_regex: CliError = CoreError::Config {
            message: "invalid pattern".into(),
        }
        .into();
        assert_eq!(bad_regex.exit_code(), exit_code::USAGE);

        assert_eq!(CliError::PartialFailure { failed: 2 }.exit_code(), exit_code::PARTIAL);
        assert_eq!(CliError::Timeout { seconds: 30 }.exit_code(), exit_code::TIMEOUT);
    }
}
