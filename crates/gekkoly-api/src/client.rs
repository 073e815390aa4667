// QueryApi HTTP client
//
// Wraps `reqwest::Client` with myGekko-specific URL construction and
// response handling for the three endpoints the gateway needs:
// discovery (`/api/v1/var/`), status polling (`/api/v1/var/status`),
// and item commands (`/api/v1/var/<kind>/<item>/scmd/set`).

use tracing::debug;
use url::{Url, form_urlencoded};

use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::transport::TransportConfig;

/// Raw HTTP client for the myGekko QueryApi.
///
/// Carries the credential suffix on every request. Responses come back
/// as `serde_json::Value` — the core crate owns the typed view, because
/// the QueryApi tree is free-form below the kind level.
pub struct QueryApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl QueryApiClient {
    /// Create a new client from a controller base URL and credentials.
    ///
    /// `base_url` is the controller root, e.g. `https://192.168.1.10`
    /// for a local unit or `https://live.my-gekko.com` for cloud mode.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, ApiError> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/v1/var/{path}?{query}&{credentials}`.
    ///
    /// The credential suffix always goes last, matching the documented
    /// request shape.
    fn var_url(&self, path: &str, query: Option<String>) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(&format!("api/v1/var/{path}"))?;
        let creds = self.credentials.query_suffix();
        let full_query = match query {
            Some(q) => format!("{q}&{creds}"),
            None => creds,
        };
        url.set_query(Some(&full_query));
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the discovery tree: `GET /api/v1/var/?<credentials>`.
    ///
    /// Returns the full name tree as raw JSON, keyed by kind then item id.
    pub async fn fetch_tree(&self) -> Result<serde_json::Value, ApiError> {
        let url = self.var_url("", None)?;
        self.get_json(url).await
    }

    /// Fetch a status snapshot: `GET /api/v1/var/status?<credentials>`.
    pub async fn fetch_status(&self) -> Result<serde_json::Value, ApiError> {
        let url = self.var_url("status", None)?;
        self.get_json(url).await
    }

    /// Issue an item command:
    /// `GET /api/v1/var/<kind>/<itemId>/scmd/set?value=<value>&<credentials>`.
    ///
    /// The response body is not meaningful; only the status code is checked.
    pub async fn send_command(
        &self,
        kind: &str,
        item_id: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        let value_query = form_urlencoded::Serializer::new(String::new())
            .append_pair("value", value)
            .finish();
        let url = self.var_url(&format!("{kind}/{item_id}/scmd/set"), Some(value_query))?;

        debug!(path = url.path(), "GET (command)");
        let resp = self.http.get(url).send().await.map_err(ApiError::Transport)?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(ApiError::Status { status });
        }
        Ok(())
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and parse the body as JSON.
    ///
    /// Only the path is logged — the query string carries credentials.
    async fn get_json(&self, url: Url) -> Result<serde_json::Value, ApiError> {
        debug!(path = url.path(), "GET");

        let resp = self.http.get(url).send().await.map_err(ApiError::Transport)?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(ApiError::Status { status });
        }

        let body = resp.text().await.map_err(ApiError::Transport)?;
        serde_json::from_str(&body).map_err(|e| ApiError::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
