//! Startup reconciliation report.

use tabled::Tabled;

use routekeeper_core::{DomainManager, ProxyAdmin, ReconcileReport, StartKind};

use crate::cli::GlobalOpts;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReconcileRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn rows(report: &ReconcileReport) -> Vec<ReconcileRow> {
    let added = report.added.iter().map(|d| ReconcileRow {
        domain: d.clone(),
        status: "added",
        detail: String::new(),
    });
    let present = report.present.iter().map(|d| ReconcileRow {
        domain: d.clone(),
        status: "present",
        detail: String::new(),
    });
    let failed = report.failed.iter().map(|f| ReconcileRow {
        domain: f.domain.clone(),
        status: "failed",
        detail: f.reason.clone(),
    });
    added.chain(present).chain(failed).collect()
}

fn start_label(start: StartKind) -> &'static str {
    match start {
        StartKind::Cold => "cold start (no persisted configuration)",
        StartKind::Warm => "warm start (persisted configuration applied)",
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle<P: ProxyAdmin>(manager: &DomainManager<P>, global: &GlobalOpts) {
    let out = output::render_single(
        &global.output,
        manager.last_report(),
        |r| format!("{}\n{}", start_label(r.start), output::render_table(&rows(r))),
        |r| {
            rows(r)
                .iter()
                .map(|row| format!("{}\t{}", row.status, row.domain))
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);
}
