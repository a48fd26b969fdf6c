// Caddy admin API HTTP client
//
// Wraps `reqwest::Client` with admin URL construction and Caddy's error
// body convention (`{"error": "..."}` on any non-2xx answer). Only the
// full-document endpoints are used: the caller owns the document and
// replaces it wholesale on every change.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::CaddyConfig;
use crate::transport::TransportConfig;

/// Raw HTTP client for the Caddy admin endpoint.
pub struct AdminClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

/// Body Caddy sends with every failed admin request.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

impl AdminClient {
    /// Create a new admin client from a `TransportConfig`.
    ///
    /// `base_url` is the admin listener root, e.g. `http://localhost:2019`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: with_trailing_slash(base_url),
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Create an admin client around a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: with_trailing_slash(base_url),
            timeout_secs: 0,
        })
    }

    /// The admin endpoint base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Replace the running configuration.
    ///
    /// `POST /load` -- Caddy validates and provisions the whole document
    /// before swapping it in, so a rejected document leaves the old config
    /// running.
    pub async fn load(&self, config: &CaddyConfig) -> Result<(), Error> {
        let url = self.url("load")?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(config)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.check_status(resp).await.map(drop)
    }

    /// Fetch the running configuration.
    ///
    /// `GET /config/` -- a fresh Caddy with no config answers `null`, which
    /// maps to an empty document.
    pub async fn get_config(&self) -> Result<CaddyConfig, Error> {
        let url = self.url("config/")?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let resp = self.check_status(resp).await?;
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(CaddyConfig::default());
        }

        serde_json::from_str(trimmed).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Pass 2xx responses through; turn anything else into `Error::Rejected`.
    async fn check_status(&self, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_owned());

        Err(Error::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// `Url::join` drops the last path segment unless it ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
