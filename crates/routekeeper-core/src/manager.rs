// ── Domain manager ──
//
// Owns the proxy for the lifetime of the process. Startup reconciles the
// default domain set best-effort (a broken default is logged and skipped);
// the operational surface after that is strict and returns typed errors.
// One async mutex serializes every validate -> apply -> persist sequence.

use std::collections::BTreeSet;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use routekeeper_api::CaddyConfig;

use crate::config::ManagerConfig;
use crate::error::CoreError;
use crate::proxy::ProxyAdmin;
use crate::tls::DnsChallengeConfig;
use crate::validate::{is_wildcard, normalize_domain};

// ── Startup report ───────────────────────────────────────────────

/// Which startup branch ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartKind {
    /// No persisted document: bootstrapped from scratch.
    Cold,
    /// Persisted document loaded and applied.
    Warm,
}

/// A default domain that could not be applied during startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDomain {
    pub domain: String,
    pub reason: String,
}

/// Outcome of startup reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub start: StartKind,
    /// Default domains added by this run.
    pub added: Vec<String>,
    /// Default domains that were already routed.
    pub present: Vec<String>,
    /// Default domains that failed and were skipped.
    pub failed: Vec<FailedDomain>,
}

impl ReconcileReport {
    fn new(start: StartKind) -> Self {
        Self {
            start,
            added: Vec::new(),
            present: Vec::new(),
            failed: Vec::new(),
        }
    }
}

// ── DomainManager ────────────────────────────────────────────────

/// The reconciliation engine and its operational surface.
///
/// Construct once with [`start()`](Self::start) and share by reference
/// (or behind an `Arc`) with whatever layer exposes it.
pub struct DomainManager<P> {
    config: ManagerConfig,
    proxy: Mutex<P>,
    report: ReconcileReport,
}

impl<P: ProxyAdmin> DomainManager<P> {
    /// Load or bootstrap the proxy configuration and make sure every default
    /// domain is routed.
    ///
    /// Persistence failures and failures to apply the base document abort
    /// startup. Individual default domains failing do not.
    pub async fn start(config: ManagerConfig, mut proxy: P) -> Result<Self, CoreError> {
        let report = reconcile(&config, &mut proxy).await?;
        info!(
            start = ?report.start,
            added = report.added.len(),
            failed = report.failed.len(),
            "startup reconciliation complete"
        );
        Ok(Self {
            config,
            proxy: Mutex::new(proxy),
            report,
        })
    }

    /// The configuration this manager was started with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// What startup reconciliation did.
    pub fn last_report(&self) -> &ReconcileReport {
        &self.report
    }

    /// A fresh DNS-01 challenge config built from the configured credentials.
    pub fn build_dns_challenge_config(&self) -> DnsChallengeConfig {
        DnsChallengeConfig::from_credentials(&self.config.dns)
    }

    // ── Operational surface ──────────────────────────────────────

    /// Route `domain` to `upstream` (or the SaaS upstream when none is given)
    /// and persist. Returns the upstream that was applied.
    pub async fn add_custom_domain(
        &self,
        domain: &str,
        upstream: Option<&str>,
    ) -> Result<String, CoreError> {
        let domain = normalized(domain)?;
        let domain = domain.as_str();
        let upstream = upstream
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.config.saas_upstream)
            .to_owned();

        let mut proxy = self.proxy.lock().await;
        if !proxy.add_domain(domain, &upstream).await? {
            return Err(CoreError::ProxyApply {
                target: domain.to_owned(),
                message: format!("failed to add domain {domain} -> {upstream}"),
            });
        }
        proxy.save_config(&self.config.config_path)?;

        info!(%domain, %upstream, "custom domain added");
        Ok(upstream)
    }

    /// Remove the route for `domain` and persist.
    pub async fn remove_custom_domain(&self, domain: &str) -> Result<(), CoreError> {
        let domain = normalized(domain)?;
        let domain = domain.as_str();
        if self
            .config
            .default_domains
            .iter()
            .any(|d| normalize_domain(d).as_deref() == Some(domain))
        {
            warn!(%domain, "removing a default domain; it will be restored on next startup");
        }

        let mut proxy = self.proxy.lock().await;
        if !proxy.delete_domain(domain).await? {
            return Err(CoreError::NotFound {
                domain: domain.to_owned(),
            });
        }
        proxy.save_config(&self.config.config_path)?;

        info!(%domain, "custom domain removed");
        Ok(())
    }

    /// Domains currently routed by the live proxy.
    pub async fn list_domains(&self) -> Result<BTreeSet<String>, CoreError> {
        self.proxy.lock().await.list_domains().await
    }

    /// Snapshot of the in-memory configuration document.
    pub async fn current_config(&self) -> CaddyConfig {
        self.proxy.lock().await.config().clone()
    }
}

/// Validate `domain` and return the form it is stored under.
fn normalized(domain: &str) -> Result<String, CoreError> {
    normalize_domain(domain).ok_or_else(|| CoreError::Validation {
        domain: domain.to_owned(),
    })
}

// ── Startup reconciliation ───────────────────────────────────────

async fn reconcile<P: ProxyAdmin>(
    config: &ManagerConfig,
    proxy: &mut P,
) -> Result<ReconcileReport, CoreError> {
    let path = &config.config_path;

    let report = if proxy.load_config_from_file(path).await? {
        info!("existing configuration found, ensuring default domains are present");
        let mut report = ReconcileReport::new(StartKind::Warm);
        let existing = proxy.list_domains().await?;

        // Defaults never override a route that already exists under the same name.
        let mut missing = Vec::new();
        for domain in &config.default_domains {
            let key = normalize_domain(domain);
            if existing.contains(domain) || key.is_some_and(|k| existing.contains(&k)) {
                info!(%domain, "default domain already exists");
                report.present.push(domain.clone());
            } else {
                missing.push(domain.as_str());
            }
        }
        add_defaults(config, proxy, &missing, &mut report).await;
        report
    } else {
        info!("no existing configuration found, initializing with defaults");
        proxy.init_config().await?;
        let mut report = ReconcileReport::new(StartKind::Cold);
        let all: Vec<&str> = config.default_domains.iter().map(String::as_str).collect();
        add_defaults(config, proxy, &all, &mut report).await;
        report
    };

    // Saved unconditionally so the file always reflects the live document.
    proxy.save_config(path)?;
    Ok(report)
}

/// Best-effort: failures are logged and recorded, never returned.
async fn add_defaults<P: ProxyAdmin>(
    config: &ManagerConfig,
    proxy: &mut P,
    domains: &[&str],
    report: &mut ReconcileReport,
) {
    let upstream = config.default_upstream.as_str();
    for &domain in domains {
        info!(%domain, %upstream, "adding default domain");
        match add_default(config, proxy, domain, upstream).await {
            Ok(added) => report.added.push(added),
            Err(e) => {
                error!(%domain, error = %e, "failed to add default domain");
                report.failed.push(FailedDomain {
                    domain: domain.to_owned(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

async fn add_default<P: ProxyAdmin>(
    config: &ManagerConfig,
    proxy: &mut P,
    domain: &str,
    upstream: &str,
) -> Result<String, CoreError> {
    let domain = normalized(domain)?;
    let domain = domain.as_str();

    let applied = if is_wildcard(domain) {
        let tls = DnsChallengeConfig::from_credentials(&config.dns);
        proxy.add_domain_with_tls(domain, upstream, &tls).await?
    } else {
        proxy.add_domain(domain, upstream).await?
    };

    if applied {
        Ok(domain.to_owned())
    } else {
        Err(CoreError::ProxyApply {
            target: domain.to_owned(),
            message: "proxy rejected the route".into(),
        })
    }
}
