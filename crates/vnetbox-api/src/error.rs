use thiserror::Error;

/// Top-level error type for the `vnetbox-api` crate.
///
/// Covers every failure mode of the REST surface: authentication,
/// transport, structured API rejections, and payload decoding.
/// `vnetbox-core` maps these into reconciliation-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token rejected (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success response from the API. `message` is a flattened
    /// rendering of the validation payload, `body` the raw response.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        body: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Fragments NetBox uses in validation errors for natural-key collisions.
const CONFLICT_MARKERS: &[&str] = &[
    "duplicate",
    "must be unique",
    "already exists",
    "unique constraint",
    "is violated",
];

impl Error {
    /// Returns `true` if the token was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the server refused a create because the natural
    /// key is already taken (duplicate prefix, device name per site, slug).
    pub fn is_uniqueness_conflict(&self) -> bool {
        match self {
            Self::Api { status: 409, .. } => true,
            Self::Api {
                status: 400,
                message,
                body,
            } => {
                let haystack = format!("{message} {body}").to_lowercase();
                CONFLICT_MARKERS.iter().any(|m| haystack.contains(m))
            }
            _ => false,
        }
    }

    /// HTTP status code, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, body: &str) -> Error {
        Error::Api {
            status,
            message: body.to_owned(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn duplicate_prefix_is_conflict() {
        let err = api(
            400,
            r#"{"prefix": ["Duplicate prefix found in global table: 10.0.0.0/16"]}"#,
        );
        assert!(err.is_uniqueness_conflict());
    }

    #[test]
    fn device_name_per_site_is_conflict() {
        let err = api(400, r#"{"__all__": ["Device name must be unique per site."]}"#);
        assert!(err.is_uniqueness_conflict());
    }

    #[test]
    fn plain_validation_error_is_not_conflict() {
        let err = api(400, r#"{"status": ["\"bogus\" is not a valid choice."]}"#);
        assert!(!err.is_uniqueness_conflict());
        assert!(!err.is_transient());
    }

    #[test]
    fn http_409_is_conflict() {
        assert!(api(409, "").is_uniqueness_conflict());
    }

    #[test]
    fn gateway_errors_are_transient() {
        assert!(api(503, "").is_transient());
        assert!(Error::Timeout { timeout_secs: 30 }.is_transient());
    }
}
