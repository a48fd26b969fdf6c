//! Domain command handlers.

use serde::Serialize;
use tabled::Tabled;

use routekeeper_core::document;
use routekeeper_core::{DomainManager, ProxyAdmin, normalize_domain};

use crate::cli::{AddArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Data ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DomainEntry {
    domain: String,
    upstreams: Vec<String>,
    dns_challenge: bool,
}

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Upstream")]
    upstream: String,
    #[tabled(rename = "DNS-01")]
    dns_challenge: String,
}

impl From<&DomainEntry> for DomainRow {
    fn from(e: &DomainEntry) -> Self {
        Self {
            domain: e.domain.clone(),
            upstream: e.upstreams.join(", "),
            dns_challenge: if e.dns_challenge { "yes" } else { "" }.into(),
        }
    }
}

#[derive(Serialize)]
struct AddedDomain {
    domain: String,
    upstream: String,
}

#[derive(Serialize)]
struct RemovedDomain {
    domain: String,
    removed: bool,
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list<P: ProxyAdmin>(
    manager: &DomainManager<P>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let live = manager.list_domains().await?;

    // Upstreams and policies come from the in-memory document; domains
    // routed by something else show up without them.
    let config = manager.current_config().await;
    let mut table = document::route_table(&config, &manager.config().proxy.server_name);
    let entries: Vec<DomainEntry> = live
        .into_iter()
        .map(|domain| DomainEntry {
            upstreams: table.remove(&domain).unwrap_or_default(),
            dns_challenge: config
                .tls_policies()
                .iter()
                .any(|p| p.subjects.contains(&domain)),
            domain,
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &entries,
        |e| DomainRow::from(e),
        |e| e.domain.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn add<P: ProxyAdmin>(
    manager: &DomainManager<P>,
    args: AddArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let upstream = manager
        .add_custom_domain(&args.domain, args.upstream.as_deref())
        .await?;

    let added = AddedDomain {
        domain: normalize_domain(&args.domain).unwrap_or(args.domain),
        upstream,
    };
    let out = output::render_single(
        &global.output,
        &added,
        |a| format!("Added {} -> {}", a.domain, a.upstream),
        |a| a.domain.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn remove<P: ProxyAdmin>(
    manager: &DomainManager<P>,
    domain: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    manager.remove_custom_domain(domain).await?;

    let removed = RemovedDomain {
        domain: normalize_domain(domain).unwrap_or_else(|| domain.to_owned()),
        removed: true,
    };
    let out = output::render_single(
        &global.output,
        &removed,
        |r| format!("Removed {}", r.domain),
        |r| r.domain.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
