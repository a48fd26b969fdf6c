//! Layered configuration for routekeeper.
//!
//! Built-in defaults, then an optional TOML file, then the process
//! environment. The flat environment names Caddy deployments already use
//! (`CADDY_ADMIN_URL`, `NAMECHEAP_API_KEY`, ...) are read as-is; every key
//! can also be set with a `ROUTEKEEPER_` prefix. The result is translated
//! into `routekeeper_core::ManagerConfig`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

use routekeeper_core::{
    DEFAULT_ADMIN_URL, DEFAULT_DOMAINS, DnsCredentials, ManagerConfig, NAMECHEAP_API_ENDPOINT,
    ProxySettings, TlsMode, is_valid_upstream,
};

/// Unprefixed environment variables honoured verbatim.
const RAW_ENV_KEYS: &[&str] = &[
    "CADDY_ADMIN_URL",
    "CADDY_CONFIG_FILE",
    "SAAS_UPSTREAM",
    "LOCAL_PORT",
    "DISABLE_HTTPS",
    "RENDERIX_UPSTREAM",
    "NAMECHEAP_API_KEY",
    "NAMECHEAP_USER",
    "NAMECHEAP_CLIENT_IP",
];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// Flat process settings. Field names double as TOML keys and (upper-cased)
/// environment variable names.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Caddy admin API base URL.
    pub caddy_admin_url: String,
    /// PEM CA bundle for an HTTPS admin endpoint with a private CA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caddy_admin_ca_cert: Option<PathBuf>,
    /// Skip certificate verification for the admin endpoint.
    #[serde(deserialize_with = "flag")]
    pub caddy_admin_insecure: bool,
    /// Where the Caddy document is persisted.
    pub caddy_config_file: PathBuf,
    /// Upstream for custom domains added without one.
    pub saas_upstream: String,
    pub local_port: u16,
    #[serde(deserialize_with = "flag")]
    pub disable_https: bool,
    /// Upstream every default domain routes to.
    pub renderix_upstream: String,

    // DNS-01 credentials
    pub dns_provider: String,
    #[serde(deserialize_with = "lenient_string")]
    pub namecheap_api_key: String,
    #[serde(deserialize_with = "lenient_string")]
    pub namecheap_user: String,
    pub namecheap_client_ip: String,
    pub namecheap_api_endpoint: String,

    pub server_name: String,
    pub request_timeout_secs: u64,
    pub default_domains: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            caddy_admin_url: DEFAULT_ADMIN_URL.into(),
            caddy_admin_ca_cert: None,
            caddy_admin_insecure: false,
            caddy_config_file: PathBuf::from("domains/caddy.json"),
            saas_upstream: "example.com:443".into(),
            local_port: 443,
            disable_https: false,
            renderix_upstream: "localhost:3001".into(),
            dns_provider: "namecheap".into(),
            namecheap_api_key: String::new(),
            namecheap_user: String::new(),
            namecheap_client_ip: String::new(),
            namecheap_api_endpoint: NAMECHEAP_API_ENDPOINT.into(),
            server_name: "srv0".into(),
            request_timeout_secs: 30,
            default_domains: DEFAULT_DOMAINS.iter().map(|d| (*d).to_owned()).collect(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("caddy_admin_url", &self.caddy_admin_url)
            .field("caddy_admin_ca_cert", &self.caddy_admin_ca_cert)
            .field("caddy_admin_insecure", &self.caddy_admin_insecure)
            .field("caddy_config_file", &self.caddy_config_file)
            .field("saas_upstream", &self.saas_upstream)
            .field("local_port", &self.local_port)
            .field("disable_https", &self.disable_https)
            .field("renderix_upstream", &self.renderix_upstream)
            .field("dns_provider", &self.dns_provider)
            .field("namecheap_api_key", &"[REDACTED]")
            .field("namecheap_user", &self.namecheap_user)
            .field("namecheap_client_ip", &self.namecheap_client_ip)
            .field("namecheap_api_endpoint", &self.namecheap_api_endpoint)
            .field("server_name", &self.server_name)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("default_domains", &self.default_domains)
            .finish()
    }
}

impl Settings {
    /// Load settings: defaults, then `path` (if any), then the environment.
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile {
                    path: path.to_owned(),
                });
            }
            figment = figment.merge(Toml::file(path));
        }

        let settings = figment
            .merge(Env::raw().only(RAW_ENV_KEYS))
            // ROUTEKEEPER_CONFIG names the file itself, not a setting.
            .merge(Env::prefixed("ROUTEKEEPER_").ignore(&["CONFIG"]))
            .extract()?;
        Ok(settings)
    }

    /// Validate and translate into the engine's configuration.
    pub fn into_manager_config(self) -> Result<ManagerConfig, ConfigError> {
        let admin_url = Url::parse(&self.caddy_admin_url).map_err(|e| ConfigError::Validation {
            field: "caddy_admin_url".into(),
            reason: format!("{e}: {}", self.caddy_admin_url),
        })?;
        if !matches!(admin_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "caddy_admin_url".into(),
                reason: format!("unsupported scheme '{}'", admin_url.scheme()),
            });
        }

        for (field, upstream) in [
            ("saas_upstream", &self.saas_upstream),
            ("renderix_upstream", &self.renderix_upstream),
        ] {
            if !is_valid_upstream(upstream) {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: format!("expected host:port, got '{upstream}'"),
                });
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "request_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }

        let tls = match (self.caddy_admin_insecure, self.caddy_admin_ca_cert) {
            (true, _) => TlsMode::DangerAcceptInvalid,
            (false, Some(path)) => TlsMode::CustomCa(path),
            (false, None) => TlsMode::System,
        };

        Ok(ManagerConfig {
            config_path: self.caddy_config_file,
            saas_upstream: self.saas_upstream,
            default_upstream: self.renderix_upstream,
            default_domains: self.default_domains,
            dns: DnsCredentials {
                provider: self.dns_provider,
                api_key: SecretString::from(self.namecheap_api_key),
                user: self.namecheap_user,
                client_ip: self.namecheap_client_ip,
                api_endpoint: self.namecheap_api_endpoint,
            },
            proxy: ProxySettings {
                admin_url,
                server_name: self.server_name,
                local_port: self.local_port,
                disable_https: self.disable_https,
                timeout: Duration::from_secs(self.request_timeout_secs),
                tls,
            },
        })
    }
}

// ── Lenient scalars ─────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// `true` for a boolean `true` or any casing of the string `"true"`.
/// Everything else is `false`.
fn flag<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(match Scalar::deserialize(de)? {
        Scalar::Bool(b) => b,
        Scalar::Str(s) => s.trim().eq_ignore_ascii_case("true"),
        Scalar::Int(_) | Scalar::Float(_) => false,
    })
}

/// Accept values the environment parser turned into numbers or booleans.
fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Scalar::deserialize(de)? {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Str(s) => s,
    })
}
