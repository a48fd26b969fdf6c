// Caddy JSON config document
//
// Only the parts that domain routing touches are typed: the HTTP app's
// servers and routes, and the TLS app's automation policies. Every struct
// carries a flattened catch-all so fields we don't model survive a
// load/save cycle untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Full Caddy configuration, as accepted by `POST /load`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaddyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<Apps>,
    /// Catch-all for top-level keys (`admin`, `logging`, `storage`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The `apps` object. Only `http` and `tls` are modeled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Apps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpApp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsApp>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ── HTTP app ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpApp {
    #[serde(default)]
    pub servers: BTreeMap<String, Server>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One HTTP server block (`apps.http.servers.<name>`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listen: Vec<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_https: Option<AutomaticHttps>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomaticHttps {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A single route: matchers plus a handler chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<RouteMatch>,
    /// Handler objects. Kept as raw JSON since each handler module has its
    /// own schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handle: Vec<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub terminal: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A matcher set. Only the `host` matcher is modeled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteMatch {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Route {
    /// All hosts this route matches, across every matcher set.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.matchers
            .iter()
            .flat_map(|m| m.host.iter().map(String::as_str))
    }

    /// Returns `true` if any matcher set names `host`, ignoring ASCII case.
    pub fn matches_host(&self, host: &str) -> bool {
        self.hosts().any(|h| h.eq_ignore_ascii_case(host))
    }

    /// Dial addresses of every `reverse_proxy` handler in this route.
    pub fn upstreams(&self) -> Vec<String> {
        self.handle
            .iter()
            .filter(|h| h.get("handler").and_then(Value::as_str) == Some("reverse_proxy"))
            .filter_map(|h| h.get("upstreams").and_then(Value::as_array))
            .flatten()
            .filter_map(|u| u.get("dial").and_then(Value::as_str))
            .map(str::to_owned)
            .collect()
    }
}

// ── TLS app ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsApp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation: Option<TlsAutomation>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsAutomation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<AutomationPolicy>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Certificate automation policy for a set of subjects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationPolicy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    /// Issuer modules (`acme`, `zerossl`, ...) as raw JSON.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuers: Vec<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ── Accessors ────────────────────────────────────────────────────────

impl CaddyConfig {
    /// Look up an HTTP server by name.
    pub fn server(&self, name: &str) -> Option<&Server> {
        self.apps
            .as_ref()?
            .http
            .as_ref()?
            .servers
            .get(name)
    }

    /// Mutable access to the HTTP server `name`, creating the `apps.http`
    /// path and an empty server if any piece is missing.
    pub fn server_mut(&mut self, name: &str) -> &mut Server {
        self.apps
            .get_or_insert_with(Apps::default)
            .http
            .get_or_insert_with(HttpApp::default)
            .servers
            .entry(name.to_owned())
            .or_default()
    }

    /// TLS automation policies, empty when no TLS app is configured.
    pub fn tls_policies(&self) -> &[AutomationPolicy] {
        self.apps
            .as_ref()
            .and_then(|a| a.tls.as_ref())
            .and_then(|t| t.automation.as_ref())
            .map(|a| a.policies.as_slice())
            .unwrap_or_default()
    }

    /// Mutable TLS automation policies, creating the path if missing.
    pub fn tls_policies_mut(&mut self) -> &mut Vec<AutomationPolicy> {
        &mut self
            .apps
            .get_or_insert_with(Apps::default)
            .tls
            .get_or_insert_with(TlsApp::default)
            .automation
            .get_or_insert_with(TlsAutomation::default)
            .policies
    }
}
