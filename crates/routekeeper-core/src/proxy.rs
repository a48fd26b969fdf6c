// ── Proxy admin client ──
//
// `ProxyAdmin` is the seam between the reconciliation engine and a live
// proxy. `CaddyProxy` implements it by keeping the authoritative document
// in memory and pushing the whole thing through `POST /load` on every
// change. A rejected document is never committed locally, so the in-memory
// copy always mirrors what Caddy is running.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::Path;

use tracing::{debug, info, warn};

use routekeeper_api::transport::TransportConfig;
use routekeeper_api::{AdminClient, CaddyConfig};

use crate::config::ProxySettings;
use crate::document;
use crate::error::CoreError;
use crate::store::{ConfigStore, FileStore};
use crate::tls::DnsChallengeConfig;

/// Operations the engine needs from a running reverse proxy.
///
/// Adds return `Ok(false)` when the proxy refused the change; deletes return
/// `Ok(false)` when there was nothing to delete. `Err` means the proxy could
/// not be asked at all, or refused a delete.
pub trait ProxyAdmin: Send {
    /// Apply a minimal empty configuration.
    fn init_config(&mut self) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Domains currently routed by the live proxy.
    fn list_domains(&self) -> impl Future<Output = Result<BTreeSet<String>, CoreError>> + Send;

    /// Add or replace a plain route.
    fn add_domain(
        &mut self,
        domain: &str,
        upstream: &str,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// Add or replace a route whose certificate is issued via DNS-01.
    fn add_domain_with_tls(
        &mut self,
        domain: &str,
        upstream: &str,
        tls: &DnsChallengeConfig,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// Remove the route for `domain`. `Ok(false)` if there was none.
    fn delete_domain(
        &mut self,
        domain: &str,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// Load a persisted document and make it live. `Ok(false)` if no file exists.
    fn load_config_from_file(
        &mut self,
        path: &Path,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// Persist the current document.
    fn save_config(&self, path: &Path) -> Result<(), CoreError>;

    /// The current in-memory document.
    fn config(&self) -> &CaddyConfig;
}

// ── CaddyProxy ───────────────────────────────────────────────────────

/// `ProxyAdmin` backed by the Caddy admin API and a `ConfigStore`.
pub struct CaddyProxy<S = FileStore> {
    client: AdminClient,
    store: S,
    settings: ProxySettings,
    config: CaddyConfig,
}

impl CaddyProxy<FileStore> {
    /// Build a proxy client for `settings`, persisting to JSON files.
    pub fn new(settings: ProxySettings) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: settings.tls.clone(),
            timeout: settings.timeout,
        };
        let client = AdminClient::new(settings.admin_url.clone(), &transport)?;
        Ok(Self::with_store(client, FileStore, settings))
    }
}

impl<S: ConfigStore> CaddyProxy<S> {
    /// Assemble from parts. The document starts empty until
    /// `init_config` or `load_config_from_file` runs.
    pub fn with_store(client: AdminClient, store: S, settings: ProxySettings) -> Self {
        Self {
            client,
            store,
            settings,
            config: CaddyConfig::default(),
        }
    }

    /// Push `candidate` to Caddy and commit it locally on success.
    async fn apply(&mut self, target: &str, candidate: CaddyConfig) -> Result<bool, CoreError> {
        match self.client.load(&candidate).await {
            Ok(()) => {
                self.config = candidate;
                Ok(true)
            }
            Err(e) if e.is_rejection() => {
                warn!(%target, error = %e, "Caddy rejected configuration change");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert(
        &mut self,
        domain: &str,
        upstream: &str,
        tls: Option<&DnsChallengeConfig>,
    ) -> Result<bool, CoreError> {
        let server = self.settings.server_name.clone();
        let mut candidate = self.config.clone();
        document::upsert_route(
            &mut candidate,
            &server,
            domain,
            document::reverse_proxy_route(domain, upstream),
        );
        if let Some(tls) = tls {
            document::upsert_tls_policy(&mut candidate, domain, tls.to_issuer());
        }

        let applied = self.apply(domain, candidate).await?;
        if applied {
            info!(%domain, %upstream, tls = tls.is_some(), "route applied");
        }
        Ok(applied)
    }
}

impl<S: ConfigStore> ProxyAdmin for CaddyProxy<S> {
    async fn init_config(&mut self) -> Result<(), CoreError> {
        let candidate = document::bootstrap(&self.settings);
        self.client
            .load(&candidate)
            .await
            .map_err(|e| CoreError::from(e).for_target("bootstrap configuration"))?;
        self.config = candidate;
        info!(
            server = %self.settings.server_name,
            port = self.settings.local_port,
            "initialized empty configuration"
        );
        Ok(())
    }

    async fn list_domains(&self) -> Result<BTreeSet<String>, CoreError> {
        let live = self.client.get_config().await?;
        let domains = document::hosts(&live, &self.settings.server_name);
        debug!(count = domains.len(), "listed live domains");
        Ok(domains)
    }

    async fn add_domain(&mut self, domain: &str, upstream: &str) -> Result<bool, CoreError> {
        self.upsert(domain, upstream, None).await
    }

    async fn add_domain_with_tls(
        &mut self,
        domain: &str,
        upstream: &str,
        tls: &DnsChallengeConfig,
    ) -> Result<bool, CoreError> {
        self.upsert(domain, upstream, Some(tls)).await
    }

    async fn delete_domain(&mut self, domain: &str) -> Result<bool, CoreError> {
        let mut candidate = self.config.clone();
        if !document::remove_route(&mut candidate, &self.settings.server_name, domain) {
            debug!(%domain, "no route to delete");
            return Ok(false);
        }
        document::remove_tls_policy(&mut candidate, domain);

        // A refused delete is a failure, not "no such route".
        self.client
            .load(&candidate)
            .await
            .map_err(|e| CoreError::from(e).for_target(domain))?;
        self.config = candidate;
        info!(%domain, "route deleted");
        Ok(true)
    }

    async fn load_config_from_file(&mut self, path: &Path) -> Result<bool, CoreError> {
        let Some(loaded) = self.store.load(path)? else {
            return Ok(false);
        };
        self.client
            .load(&loaded)
            .await
            .map_err(|e| CoreError::from(e).for_target("persisted configuration"))?;
        self.config = loaded;
        info!(path = %path.display(), "applied persisted configuration");
        Ok(true)
    }

    fn save_config(&self, path: &Path) -> Result<(), CoreError> {
        self.store.save(path, &self.config)
    }

    fn config(&self) -> &CaddyConfig {
        &self.config
    }
}
