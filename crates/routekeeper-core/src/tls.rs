// DNS-01 challenge configuration for wildcard certificates
//
// Wildcard names cannot be validated over HTTP-01 or TLS-ALPN-01, so their
// automation policy carries an ACME issuer with a DNS provider block.
// Credentials are not checked here; Caddy reports bad ones when it tries
// to issue.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::config::DnsCredentials;

/// DNS provider block attached to a wildcard route's TLS policy.
#[derive(Debug, Clone)]
pub struct DnsChallengeConfig {
    provider: String,
    api_key: SecretString,
    user: String,
    client_ip: String,
    api_endpoint: String,
}

impl DnsChallengeConfig {
    /// Build a fresh challenge config from process-level credentials.
    pub fn from_credentials(creds: &DnsCredentials) -> Self {
        Self {
            provider: creds.provider.clone(),
            api_key: creds.api_key.clone(),
            user: creds.user.clone(),
            client_ip: creds.client_ip.clone(),
            api_endpoint: creds.api_endpoint.clone(),
        }
    }

    /// The Caddy DNS provider module name.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The `challenges` object of an ACME issuer:
    /// `{"dns": {"provider": {"name": ..., "api_key": ..., ...}}}`.
    pub fn to_challenges(&self) -> Value {
        json!({
            "dns": {
                "provider": {
                    "name": self.provider,
                    "api_key": self.api_key.expose_secret(),
                    "user": self.user,
                    "api_endpoint": self.api_endpoint,
                    "client_ip": self.client_ip,
                }
            }
        })
    }

    /// A complete ACME issuer using this DNS challenge.
    pub fn to_issuer(&self) -> Value {
        json!({
            "module": "acme",
            "challenges": self.to_challenges(),
        })
    }
}
