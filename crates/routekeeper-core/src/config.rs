// ── Runtime manager configuration ──
//
// These types describe what the manager reconciles and how it reaches
// Caddy. They carry credentials and tuning but never touch disk or the
// environment: `routekeeper-config` builds a `ManagerConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use routekeeper_api::TlsMode;

/// Domains that must always route to the default upstream.
pub const DEFAULT_DOMAINS: &[&str] = &["*.bytesites.ai", "cname.bytesites.ai"];

/// Caddy's default admin listener.
pub const DEFAULT_ADMIN_URL: &str = "http://localhost:2019";

/// Namecheap's production XML API endpoint.
pub const NAMECHEAP_API_ENDPOINT: &str = "https://api.namecheap.com/xml.response";

/// DNS provider credentials used to solve DNS-01 challenges for wildcard domains.
#[derive(Debug, Clone)]
pub struct DnsCredentials {
    /// Caddy DNS provider module name (e.g. `namecheap`).
    pub provider: String,
    pub api_key: SecretString,
    /// Account / user identifier at the DNS provider.
    pub user: String,
    /// Whitelisted client IP the provider expects API calls from.
    pub client_ip: String,
    pub api_endpoint: String,
}

impl Default for DnsCredentials {
    fn default() -> Self {
        Self {
            provider: "namecheap".into(),
            api_key: SecretString::from(String::new()),
            user: String::new(),
            client_ip: String::new(),
            api_endpoint: NAMECHEAP_API_ENDPOINT.into(),
        }
    }
}

/// How to reach Caddy and shape the server block we own.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Admin API base URL (e.g. `http://localhost:2019`).
    pub admin_url: Url,
    /// Name of the HTTP server under `apps.http.servers` holding our routes.
    pub server_name: String,
    /// Port the server listens on.
    pub local_port: u16,
    /// Turn off Caddy's automatic HTTPS for the server.
    pub disable_https: bool,
    /// Admin API request timeout.
    pub timeout: Duration,
    /// Certificate verification for an HTTPS admin endpoint.
    pub tls: TlsMode,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            admin_url: Url::parse(DEFAULT_ADMIN_URL).expect("default admin URL is valid"),
            server_name: "srv0".into(),
            local_port: 443,
            disable_https: false,
            timeout: Duration::from_secs(30),
            tls: TlsMode::System,
        }
    }
}

/// Everything the `DomainManager` needs.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Where the document is persisted.
    pub config_path: PathBuf,
    /// Upstream for custom domains added without an explicit one.
    pub saas_upstream: String,
    /// Upstream every default domain routes to.
    pub default_upstream: String,
    /// Domains re-asserted on every startup, in order.
    pub default_domains: Vec<String>,
    pub dns: DnsCredentials,
    pub proxy: ProxySettings,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("domains/caddy.json"),
            saas_upstream: "example.com:443".into(),
            default_upstream: "localhost:3001".into(),
            default_domains: DEFAULT_DOMAINS.iter().map(|d| (*d).to_owned()).collect(),
            dns: DnsCredentials::default(),
            proxy: ProxySettings::default(),
        }
    }
}
