//! Clap derive structures for the `routekeeper` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// routekeeper -- keep Caddy's custom-domain routes reconciled
#[derive(Debug, Parser)]
#[command(
    name = "routekeeper",
    version,
    about = "Manage custom-domain routes on a Caddy reverse proxy",
    long_about = "Reconciles the routes of a running Caddy instance with a persisted\n\
        configuration document and a fixed set of default domains, then applies\n\
        the requested change through the Caddy admin API.\n\n\
        Every command runs startup reconciliation first.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// TOML settings file layered between defaults and the environment
    #[arg(long, env = "ROUTEKEEPER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "ROUTEKEEPER_LOG_JSON", global = true)]
    pub log_json: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run startup reconciliation and report what changed
    Reconcile,

    /// Route a custom domain to an upstream
    Add(AddArgs),

    /// Remove a custom domain's route
    #[command(alias = "rm")]
    Remove(RemoveArgs),

    /// List domains routed by the live proxy
    #[command(alias = "ls")]
    List,

    /// Print the current configuration document
    Config,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Domain to route (e.g. shop.example.com or *.example.com)
    pub domain: String,

    /// Upstream dial address (host:port); defaults to the SaaS upstream
    #[arg(long, short = 'u')]
    pub upstream: Option<String>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Domain whose route should be removed
    pub domain: String,
}
