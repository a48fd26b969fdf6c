//! Command dispatch.

pub mod config_cmd;
pub mod domains;
pub mod reconcile;

use routekeeper_core::{DomainManager, ProxyAdmin};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a parsed command to its handler.
pub async fn dispatch<P: ProxyAdmin>(
    cmd: Command,
    manager: &DomainManager<P>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Reconcile => {
            reconcile::handle(manager, global);
            Ok(())
        }
        Command::Add(args) => domains::add(manager, args, global).await,
        Command::Remove(args) => domains::remove(manager, &args.domain, global).await,
        Command::List => domains::list(manager, global).await,
        Command::Config => {
            config_cmd::handle(manager, global).await;
            Ok(())
        }
    }
}
