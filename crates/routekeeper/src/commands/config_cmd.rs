//! Print the in-memory configuration document.

use routekeeper_core::{DomainManager, ProxyAdmin};

use crate::cli::GlobalOpts;
use crate::output;

/// The document is JSON whatever `--output` says.
pub async fn handle<P: ProxyAdmin>(manager: &DomainManager<P>, global: &GlobalOpts) {
    let config = manager.current_config().await;
    output::print_output(&output::render_json_pretty(&config), global.quiet);
}
