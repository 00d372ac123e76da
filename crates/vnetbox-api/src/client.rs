// NetBox REST client
//
// Wraps `reqwest::Client` with `/api/` URL construction, token auth,
// response/error decoding, and offset pagination. Endpoint groups
// (ipam, dcim, extras) live as inherent methods in sibling files.

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::Page;

/// Results requested per page when walking a list endpoint.
const PAGE_SIZE: u64 = 200;

/// Async client for the NetBox REST API.
///
/// All paths passed to the verb helpers are relative to `{base}/api/`,
/// e.g. `"ipam/prefixes/"`.
pub struct NetboxClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl NetboxClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL (`https://netbox.example.com`), an API
    /// token, and transport settings.
    pub fn new(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(token)?;
        Self::with_client(base_url, http, transport.timeout_secs())
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(base_url: &str, http: reqwest::Client, timeout_secs: u64) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            timeout_secs,
        })
    }

    /// Append `/api/` unless the caller already pointed at it.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }
        Ok(url)
    }

    /// The normalized API root (always ends with `/api/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.handle_response(resp).await
    }

    pub(crate) async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PATCH {url}");

        let resp = self
            .http
            .patch(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.handle_response(resp).await
    }

    // ── List helpers ─────────────────────────────────────────────────

    /// Walk every page of a filtered list endpoint.
    pub(crate) async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, Error> {
        let mut all = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let mut params: Vec<(&str, String)> = filters.to_vec();
            params.push(("limit", PAGE_SIZE.to_string()));
            params.push(("offset", offset.to_string()));

            let page: Page<T> = self.get_with_params(path, &params).await?;
            let received = u64::try_from(page.results.len()).unwrap_or(u64::MAX);
            all.extend(page.results);

            let collected = u64::try_from(all.len()).unwrap_or(u64::MAX);
            if page.next.is_none() || received == 0 || collected >= page.count {
                break;
            }
            offset += received;
        }

        Ok(all)
    }

    /// Fetch at most one object matching the filters.
    ///
    /// Lookups are keyed on natural keys (slug, name+site), so more than
    /// one hit means the inventory already holds duplicates; the first is
    /// returned and the ambiguity logged.
    pub(crate) async fn find_one<T: DeserializeOwned>(
        &self,
        path: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<T>, Error> {
        let mut params: Vec<(&str, String)> = filters.to_vec();
        params.push(("limit", "2".into()));

        let page: Page<T> = self.get_with_params(path, &params).await?;
        if page.count > 1 {
            warn!(path, ?filters, count = page.count, "lookup matched more than one object");
        }
        Ok(page.results.into_iter().next())
    }

    // ── Response handling ────────────────────────────────────────────

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(|e| self.map_transport(e))?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body: body.clone(),
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => flatten_error(&value),
            Err(_) if raw.is_empty() => status.to_string(),
            Err(_) => raw.chars().take(200).collect(),
        };

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Error::Authentication { message };
        }

        Error::Api {
            status: status.as_u16(),
            message,
            body: raw,
        }
    }
}

/// Render a NetBox error payload as a single line.
///
/// Handles `{"detail": "..."}`, field maps (`{"prefix": ["..."]}`),
/// `__all__` non-field errors, and bulk-style arrays.
fn flatten_error(value: &Value) -> String {
    let mut parts = Vec::new();
    collect_messages(None, value, &mut parts);
    if parts.is_empty() {
        value.to_string()
    } else {
        parts.join("; ")
    }
}

fn collect_messages(field: Option<&str>, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => match field {
            Some(f) if f != "detail" && f != "__all__" && f != "non_field_errors" => {
                out.push(format!("{f}: {s}"));
            }
            _ => out.push(s.clone()),
        },
        Value::Array(items) => {
            for item in items {
                collect_messages(field, item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                collect_messages(Some(key), item, out);
            }
        }
        _ => {}
    }
}
