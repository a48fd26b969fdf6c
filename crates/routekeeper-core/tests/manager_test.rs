// Engine tests against an in-memory proxy.
#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use routekeeper_core::document;
use routekeeper_core::{
    CaddyConfig, CoreError, DnsChallengeConfig, DomainManager, ErrorKind, ManagerConfig,
    ProxyAdmin, ProxySettings, StartKind,
};

const SRV: &str = "srv0";

// ── Fake proxy ──────────────────────────────────────────────────────

/// Shared "disk" so tests can inspect what was persisted after the proxy
/// has moved into the manager.
#[derive(Clone, Default)]
struct Disk {
    doc: Arc<Mutex<Option<CaddyConfig>>>,
    saves: Arc<AtomicUsize>,
}

impl Disk {
    fn with(doc: CaddyConfig) -> Self {
        let disk = Self::default();
        *disk.doc.lock().unwrap() = Some(doc);
        disk
    }

    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn hosts(&self) -> BTreeSet<String> {
        let doc = self.doc.lock().unwrap();
        document::hosts(doc.as_ref().unwrap(), SRV)
    }
}

#[derive(Default)]
struct FakeProxy {
    live: CaddyConfig,
    disk: Disk,
    /// Domains the proxy refuses to route.
    reject: BTreeSet<String>,
    /// Simulate an unreachable admin API on bootstrap.
    unreachable: bool,
}

impl FakeProxy {
    fn on(disk: &Disk) -> Self {
        Self {
            disk: disk.clone(),
            ..Self::default()
        }
    }

    fn rejecting(mut self, domain: &str) -> Self {
        self.reject.insert(domain.to_owned());
        self
    }

    fn upsert(&mut self, domain: &str, upstream: &str, tls: Option<&DnsChallengeConfig>) -> bool {
        if self.reject.contains(domain) {
            return false;
        }
        let route = document::reverse_proxy_route(domain, upstream);
        document::upsert_route(&mut self.live, SRV, domain, route);
        if let Some(tls) = tls {
            document::upsert_tls_policy(&mut self.live, domain, tls.to_issuer());
        }
        true
    }
}

impl ProxyAdmin for FakeProxy {
    async fn init_config(&mut self) -> Result<(), CoreError> {
        if self.unreachable {
            return Err(CoreError::ProxyUnavailable {
                url: "http://localhost:2019/load".into(),
                reason: "connection refused".into(),
            });
        }
        self.live = document::bootstrap(&ProxySettings::default());
        Ok(())
    }

    async fn list_domains(&self) -> Result<BTreeSet<String>, CoreError> {
        Ok(document::hosts(&self.live, SRV))
    }

    async fn add_domain(&mut self, domain: &str, upstream: &str) -> Result<bool, CoreError> {
        Ok(self.upsert(domain, upstream, None))
    }

    async fn add_domain_with_tls(
        &mut self,
        domain: &str,
        upstream: &str,
        tls: &DnsChallengeConfig,
    ) -> Result<bool, CoreError> {
        Ok(self.upsert(domain, upstream, Some(tls)))
    }

    async fn delete_domain(&mut self, domain: &str) -> Result<bool, CoreError> {
        let removed = document::remove_route(&mut self.live, SRV, domain);
        document::remove_tls_policy(&mut self.live, domain);
        Ok(removed)
    }

    async fn load_config_from_file(&mut self, _path: &Path) -> Result<bool, CoreError> {
        match self.disk.doc.lock().unwrap().clone() {
            Some(doc) => {
                self.live = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn save_config(&self, _path: &Path) -> Result<(), CoreError> {
        *self.disk.doc.lock().unwrap() = Some(self.live.clone());
        self.disk.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn config(&self) -> &CaddyConfig {
        &self.live
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

async fn started(disk: &Disk) -> DomainManager<FakeProxy> {
    DomainManager::start(ManagerConfig::default(), FakeProxy::on(disk))
        .await
        .unwrap()
}

fn persisted_with(domains: &[(&str, &str)]) -> CaddyConfig {
    let mut doc = document::bootstrap(&ProxySettings::default());
    for (domain, upstream) in domains {
        let route = document::reverse_proxy_route(domain, upstream);
        document::upsert_route(&mut doc, SRV, domain, route);
    }
    doc
}

// ── Startup ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cold_start_installs_defaults_and_persists() {
    let disk = Disk::default();
    let manager = started(&disk).await;

    let report = manager.last_report();
    assert_eq!(report.start, StartKind::Cold);
    assert_eq!(report.added, vec!["*.bytesites.ai", "cname.bytesites.ai"]);
    assert!(report.failed.is_empty());

    assert_eq!(
        manager.list_domains().await.unwrap(),
        set(&["*.bytesites.ai", "cname.bytesites.ai"])
    );
    assert_eq!(disk.saves(), 1);
    assert_eq!(disk.hosts(), set(&["*.bytesites.ai", "cname.bytesites.ai"]));
}

#[tokio::test]
async fn test_cold_start_wildcard_gets_dns_challenge_policy() {
    let disk = Disk::default();
    let manager = started(&disk).await;

    let config = manager.current_config().await;
    let policies = config.tls_policies();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].subjects, vec!["*.bytesites.ai"]);
    assert_eq!(
        policies[0].issuers[0]["challenges"]["dns"]["provider"]["name"],
        "namecheap"
    );
}

#[tokio::test]
async fn test_warm_start_restores_missing_default_and_keeps_custom() {
    let disk = Disk::with(persisted_with(&[
        ("cname.bytesites.ai", "localhost:3001"),
        ("shop.example.com", "10.0.0.5:8080"),
    ]));
    let manager = started(&disk).await;

    let report = manager.last_report();
    assert_eq!(report.start, StartKind::Warm);
    assert_eq!(report.added, vec!["*.bytesites.ai"]);
    assert_eq!(report.present, vec!["cname.bytesites.ai"]);

    let expected = set(&["*.bytesites.ai", "cname.bytesites.ai", "shop.example.com"]);
    assert_eq!(manager.list_domains().await.unwrap(), expected);
    assert_eq!(disk.hosts(), expected);
    assert_eq!(disk.saves(), 1);
}

#[tokio::test]
async fn test_warm_start_never_overrides_existing_default_route() {
    let disk = Disk::with(persisted_with(&[
        ("*.bytesites.ai", "10.9.9.9:9000"),
        ("cname.bytesites.ai", "10.9.9.9:9000"),
    ]));
    let manager = started(&disk).await;

    assert!(manager.last_report().added.is_empty());
    let table = document::route_table(&manager.current_config().await, SRV);
    assert_eq!(table["cname.bytesites.ai"], vec!["10.9.9.9:9000".to_owned()]);
    // Saved even though nothing changed.
    assert_eq!(disk.saves(), 1);
}

#[tokio::test]
async fn test_default_failure_is_best_effort() {
    let disk = Disk::default();
    let proxy = FakeProxy::on(&disk).rejecting("*.bytesites.ai");
    let manager = DomainManager::start(ManagerConfig::default(), proxy)
        .await
        .unwrap();

    let report = manager.last_report();
    assert_eq!(report.added, vec!["cname.bytesites.ai"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].domain, "*.bytesites.ai");
    assert_eq!(disk.hosts(), set(&["cname.bytesites.ai"]));
}

#[tokio::test]
async fn test_invalid_default_is_skipped() {
    let disk = Disk::default();
    let config = ManagerConfig {
        default_domains: vec!["not a domain".into(), "cname.bytesites.ai".into()],
        ..ManagerConfig::default()
    };
    let manager = DomainManager::start(config, FakeProxy::on(&disk))
        .await
        .unwrap();

    let report = manager.last_report();
    assert_eq!(report.failed[0].domain, "not a domain");
    assert_eq!(report.added, vec!["cname.bytesites.ai"]);
}

#[tokio::test]
async fn test_unreachable_proxy_aborts_cold_start() {
    let disk = Disk::default();
    let proxy = FakeProxy {
        unreachable: true,
        ..FakeProxy::on(&disk)
    };

    let err = DomainManager::start(ManagerConfig::default(), proxy)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, CoreError::ProxyUnavailable { .. }), "got: {err:?}");
    assert_eq!(disk.saves(), 0);
}

// ── Operations ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_add_then_remove_custom_domain() {
    let disk = Disk::default();
    let manager = started(&disk).await;

    manager
        .add_custom_domain("shop.example.com", Some("10.0.0.5:8080"))
        .await
        .unwrap();
    assert!(manager.list_domains().await.unwrap().contains("shop.example.com"));
    assert!(disk.hosts().contains("shop.example.com"));

    manager.remove_custom_domain("shop.example.com").await.unwrap();
    assert!(!manager.list_domains().await.unwrap().contains("shop.example.com"));
    assert!(!disk.hosts().contains("shop.example.com"));
    assert_eq!(disk.saves(), 3);
}

#[tokio::test]
async fn test_add_routes_to_explicit_upstream() {
    let manager = started(&Disk::default()).await;

    let upstream = manager
        .add_custom_domain("shop.example.com", Some("10.0.0.5:8080"))
        .await
        .unwrap();
    assert_eq!(upstream, "10.0.0.5:8080");

    let table = document::route_table(&manager.current_config().await, SRV);
    assert_eq!(table["shop.example.com"], vec!["10.0.0.5:8080".to_owned()]);
}

#[tokio::test]
async fn test_add_without_upstream_uses_saas_upstream() {
    let manager = started(&Disk::default()).await;

    let a = manager.add_custom_domain("a.example.org", None).await.unwrap();
    let b = manager
        .add_custom_domain("b.example.org", Some("   "))
        .await
        .unwrap();

    assert_eq!(a, "example.com:443");
    assert_eq!(b, "example.com:443");
}

#[tokio::test]
async fn test_adding_twice_leaves_one_route() {
    let manager = started(&Disk::default()).await;

    manager
        .add_custom_domain("shop.example.com", Some("10.0.0.5:8080"))
        .await
        .unwrap();
    manager
        .add_custom_domain("shop.example.com", Some("10.0.0.6:8080"))
        .await
        .unwrap();

    let config = manager.current_config().await;
    let routes = &config.server(SRV).unwrap().routes;
    let matching = routes
        .iter()
        .filter(|r| r.matches_host("shop.example.com"))
        .count();
    assert_eq!(matching, 1);
    assert_eq!(
        document::route_table(&config, SRV)["shop.example.com"],
        vec!["10.0.0.6:8080".to_owned()]
    );
}

#[tokio::test]
async fn test_case_variants_share_one_route() {
    let disk = Disk::default();
    let manager = started(&disk).await;

    manager
        .add_custom_domain("Shop.Example.com", Some("10.0.0.5:8080"))
        .await
        .unwrap();
    manager
        .add_custom_domain("shop.example.com", Some("10.0.0.6:8080"))
        .await
        .unwrap();

    let table = document::route_table(&manager.current_config().await, SRV);
    assert!(!table.contains_key("Shop.Example.com"));
    assert_eq!(table["shop.example.com"], vec!["10.0.0.6:8080".to_owned()]);

    manager.remove_custom_domain("SHOP.EXAMPLE.COM").await.unwrap();
    let hosts = disk.hosts();
    assert!(
        !hosts.iter().any(|h| h.eq_ignore_ascii_case("shop.example.com")),
        "left behind: {hosts:?}"
    );
}

#[tokio::test]
async fn test_internationalized_domain_is_stored_as_punycode() {
    let manager = started(&Disk::default()).await;

    manager
        .add_custom_domain("bücher.example", Some("10.0.0.5:8080"))
        .await
        .unwrap();
    assert!(manager.list_domains().await.unwrap().contains("xn--bcher-kva.example"));

    manager.remove_custom_domain("xn--bcher-kva.example").await.unwrap();
    assert!(!manager.list_domains().await.unwrap().contains("xn--bcher-kva.example"));
}

#[tokio::test]
async fn test_invalid_domain_is_rejected_before_proxy() {
    let disk = Disk::default();
    let manager = started(&disk).await;
    let before = manager.list_domains().await.unwrap();

    let err = manager
        .add_custom_domain("not a domain", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.is_client_error());

    let err = manager.remove_custom_domain("-bad-.example.com").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(manager.list_domains().await.unwrap(), before);
    assert_eq!(disk.saves(), 1);
}

#[tokio::test]
async fn test_remove_unknown_domain_is_not_found() {
    let disk = Disk::default();
    let manager = started(&disk).await;

    let err = manager
        .remove_custom_domain("never-added.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { ref domain } if domain == "never-added.example.com"));
    assert_eq!(disk.saves(), 1);
}

#[tokio::test]
async fn test_proxy_rejection_surfaces_as_proxy_apply() {
    let disk = Disk::default();
    let proxy = FakeProxy::on(&disk).rejecting("shop.example.com");
    let manager = DomainManager::start(ManagerConfig::default(), proxy)
        .await
        .unwrap();

    let err = manager
        .add_custom_domain("shop.example.com", Some("10.0.0.5:8080"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProxyApply);
    assert!(!err.is_client_error());
    assert!(!manager.list_domains().await.unwrap().contains("shop.example.com"));
    assert_eq!(disk.saves(), 1);
}

#[tokio::test]
async fn test_concurrent_adds_are_serialized() {
    let disk = Disk::default();
    let manager = Arc::new(started(&disk).await);

    let (a, b) = tokio::join!(
        manager.add_custom_domain("a.example.com", Some("10.0.0.1:80")),
        manager.add_custom_domain("b.example.com", Some("10.0.0.2:80")),
    );
    a.unwrap();
    b.unwrap();

    let domains = manager.list_domains().await.unwrap();
    assert!(domains.contains("a.example.com"));
    assert!(domains.contains("b.example.com"));
    assert_eq!(disk.hosts(), domains);
}

#[tokio::test]
async fn test_build_dns_challenge_config_uses_credentials() {
    let manager = started(&Disk::default()).await;
    let issuer = manager.build_dns_challenge_config().to_issuer();
    assert_eq!(
        issuer["challenges"]["dns"]["provider"]["api_endpoint"],
        "https://api.namecheap.com/xml.response"
    );
}
