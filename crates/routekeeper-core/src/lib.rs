// routekeeper-core: Domain reconciliation between a desired route set and a live Caddy.

pub mod config;
pub mod document;
pub mod error;
pub mod manager;
pub mod proxy;
pub mod store;
pub mod tls;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    DEFAULT_ADMIN_URL, DEFAULT_DOMAINS, DnsCredentials, ManagerConfig, NAMECHEAP_API_ENDPOINT,
    ProxySettings,
};
pub use error::{CoreError, ErrorKind};
pub use manager::{DomainManager, FailedDomain, ReconcileReport, StartKind};
pub use proxy::{CaddyProxy, ProxyAdmin};
pub use store::{ConfigStore, FileStore};
pub use tls::DnsChallengeConfig;
pub use validate::{is_valid_domain, is_valid_upstream, is_wildcard, normalize_domain};

// Document and transport types that appear in the public surface.
pub use routekeeper_api::{CaddyConfig, TlsMode};
