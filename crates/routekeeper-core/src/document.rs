//! Route and TLS policy edits on the Caddy config document.
//!
//! A domain owns at most one route: every upsert first strips the domain
//! from whatever already matches it. Routes are kept ordered so exact hosts
//! are tried before wildcards, and catch-all routes stay last.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};

use routekeeper_api::{AutomaticHttps, AutomationPolicy, CaddyConfig, Route, RouteMatch};

use crate::config::ProxySettings;
use crate::validate::is_wildcard;

const HTTPS_PORT: &str = "443";

/// Minimal document: one server on `local_port` with no routes.
pub fn bootstrap(settings: &ProxySettings) -> CaddyConfig {
    let mut config = CaddyConfig::default();
    let server = config.server_mut(&settings.server_name);
    server.listen = vec![format!(":{}", settings.local_port)];
    if settings.disable_https {
        server.automatic_https = Some(AutomaticHttps {
            disable: true,
            ..AutomaticHttps::default()
        });
    }
    config
}

/// A terminal `reverse_proxy` route for `domain`.
///
/// Upstreams on port 443 are dialed over TLS, with SNI and the `Host` header
/// set to the upstream host.
pub fn reverse_proxy_route(domain: &str, upstream: &str) -> Route {
    let mut handler = json!({
        "handler": "reverse_proxy",
        "upstreams": [{ "dial": upstream }],
    });

    if let Some((host, port)) = upstream.rsplit_once(':') {
        if port == HTTPS_PORT {
            let server_name = host.trim_start_matches('[').trim_end_matches(']');
            handler["transport"] = json!({
                "protocol": "http",
                "tls": { "server_name": server_name },
            });
            handler["headers"] = json!({
                "request": { "set": { "Host": ["{http.reverse_proxy.upstream.host}"] } }
            });
        }
    }

    Route {
        matchers: vec![RouteMatch {
            host: vec![domain.to_owned()],
            ..RouteMatch::default()
        }],
        handle: vec![handler],
        terminal: true,
        ..Route::default()
    }
}

/// Every host matched by the routes of `server`.
pub fn hosts(config: &CaddyConfig, server: &str) -> BTreeSet<String> {
    config
        .server(server)
        .map(|s| {
            s.routes
                .iter()
                .flat_map(Route::hosts)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Host → upstream dial addresses for the routes of `server`.
pub fn route_table(config: &CaddyConfig, server: &str) -> BTreeMap<String, Vec<String>> {
    let mut table = BTreeMap::new();
    if let Some(srv) = config.server(server) {
        for route in &srv.routes {
            let upstreams = route.upstreams();
            for host in route.hosts() {
                table.insert(host.to_owned(), upstreams.clone());
            }
        }
    }
    table
}

/// Insert or replace the route for `domain`.
pub fn upsert_route(config: &mut CaddyConfig, server: &str, domain: &str, route: Route) {
    let routes = &mut config.server_mut(server).routes;
    strip_host(routes, domain);

    let wildcard = is_wildcard(domain);
    let pos = routes
        .iter()
        .position(|r| {
            let catch_all = r.matchers.is_empty();
            catch_all || (!wildcard && is_wildcard_only(r))
        })
        .unwrap_or(routes.len());
    routes.insert(pos, route);
}

/// Remove `domain` from the routes of `server`. Returns `false` if no route
/// matched it.
pub fn remove_route(config: &mut CaddyConfig, server: &str, domain: &str) -> bool {
    let Some(routes) = config
        .apps
        .as_mut()
        .and_then(|a| a.http.as_mut())
        .and_then(|h| h.servers.get_mut(server))
        .map(|s| &mut s.routes)
    else {
        return false;
    };

    if !routes.iter().any(|r| r.matches_host(domain)) {
        return false;
    }
    strip_host(routes, domain);
    true
}

/// Insert or replace the automation policy issuing certificates for `domain`.
pub fn upsert_tls_policy(config: &mut CaddyConfig, domain: &str, issuer: Value) {
    let policies = config.tls_policies_mut();
    strip_subject(policies, domain);

    // Subject-less policies are catch-alls and must stay behind specific ones.
    let pos = policies
        .iter()
        .position(|p| p.subjects.is_empty())
        .unwrap_or(policies.len());
    policies.insert(
        pos,
        AutomationPolicy {
            subjects: vec![domain.to_owned()],
            issuers: vec![issuer],
            ..AutomationPolicy::default()
        },
    );
}

/// Drop `domain` from every automation policy it appears in. Policies left
/// without subjects are removed; shared policies keep their other subjects.
/// Returns `true` if anything changed.
pub fn remove_tls_policy(config: &mut CaddyConfig, domain: &str) -> bool {
    if !config
        .tls_policies()
        .iter()
        .any(|p| p.subjects.iter().any(|s| s.eq_ignore_ascii_case(domain)))
    {
        return false;
    }
    strip_subject(config.tls_policies_mut(), domain);
    prune_empty_tls(config);
    true
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Remove `domain` from every host matcher. Matcher sets left without hosts
/// are dropped (an empty set would match everything), as are routes left
/// without matcher sets.
fn strip_host(routes: &mut Vec<Route>, domain: &str) {
    routes.retain_mut(|route| {
        if !route.matches_host(domain) {
            return true;
        }
        route.matchers.retain_mut(|m| {
            if !m.host.iter().any(|h| h.eq_ignore_ascii_case(domain)) {
                return true;
            }
            m.host.retain(|h| !h.eq_ignore_ascii_case(domain));
            !m.host.is_empty()
        });
        !route.matchers.is_empty()
    });
}

fn strip_subject(policies: &mut Vec<AutomationPolicy>, domain: &str) {
    policies.retain_mut(|p| {
        if !p.subjects.iter().any(|s| s.eq_ignore_ascii_case(domain)) {
            return true;
        }
        p.subjects.retain(|s| !s.eq_ignore_ascii_case(domain));
        !p.subjects.is_empty()
    });
}

fn is_wildcard_only(route: &Route) -> bool {
    let mut hosts = route.hosts().peekable();
    hosts.peek().is_some() && hosts.all(is_wildcard)
}

/// Collapse `apps.tls` back to nothing once the last policy is gone.
fn prune_empty_tls(config: &mut CaddyConfig) {
    let Some(apps) = config.apps.as_mut() else {
        return;
    };
    if let Some(tls) = apps.tls.as_mut() {
        if tls
            .automation
            .as_ref()
            .is_some_and(|a| a.policies.is_empty() && a.extra.is_empty())
        {
            tls.automation = None;
        }
        if tls.automation.is_none() && tls.extra.is_empty() {
            apps.tls = None;
        }
    }
}
