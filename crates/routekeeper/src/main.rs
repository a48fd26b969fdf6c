mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use routekeeper_config::Settings;
use routekeeper_core::{CaddyProxy, DomainManager};

use crate::cli::{Cli, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(global: &GlobalOpts) {
    let filter = match (global.quiet, global.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `-o json` / `-o plain` output stays clean.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if global.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = Settings::load(cli.global.config.as_deref())?;
    tracing::debug!(?settings, "loaded settings");

    let config = settings.into_manager_config()?;
    let proxy = CaddyProxy::new(config.proxy.clone())?;
    let manager = DomainManager::start(config, proxy).await?;

    tracing::debug!(command = ?cli.command, "dispatching command");
    commands::dispatch(cli.command, &manager, &cli.global).await
}
