//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use routekeeper_config::ConfigError;
use routekeeper_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Caller input ─────────────────────────────────────────────────

    #[error("'{domain}' is not a valid domain")]
    #[diagnostic(
        code(routekeeper::invalid_domain),
        help("Use a hostname such as shop.example.com, or *.example.com for a wildcard.")
    )]
    InvalidDomain { domain: String },

    #[error("No route exists for {domain}")]
    #[diagnostic(
        code(routekeeper::not_found),
        help("Run: routekeeper list to see routed domains")
    )]
    NotFound { domain: String },

    // ── Proxy ────────────────────────────────────────────────────────

    #[error("Caddy rejected {target}")]
    #[diagnostic(
        code(routekeeper::proxy_rejected),
        help("{message}\nCheck the upstream address and the Caddy logs.")
    )]
    ProxyRejected { target: String, message: String },

    #[error("Could not connect to the Caddy admin API")]
    #[diagnostic(
        code(routekeeper::connection_failed),
        help(
            "Check that Caddy is running with its admin endpoint enabled.\n\
             {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Persistence / settings ───────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(routekeeper::persistence),
        help("The configuration document is written to CADDY_CONFIG_FILE.")
    )]
    Persistence { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(routekeeper::settings),
        help(
            "Settings come from built-in defaults, the TOML file given by --config\n\
             or ROUTEKEEPER_CONFIG, and environment variables such as CADDY_ADMIN_URL."
        )
    )]
    Settings { message: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidDomain { .. } => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::ProxyRejected { .. } | Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Persistence { .. } | Self::Settings { .. } => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { domain } => CliError::InvalidDomain { domain },
            CoreError::NotFound { domain } => CliError::NotFound { domain },
            CoreError::ProxyApply { target, message } => {
                CliError::ProxyRejected { target, message }
            }
            CoreError::ProxyUnavailable { url, reason } => CliError::ConnectionFailed {
                reason: if url.is_empty() {
                    reason
                } else {
                    format!("{url}: {reason}")
                },
            },
            err @ (CoreError::Io { .. } | CoreError::Parse { .. }) => CliError::Persistence {
                message: err.to_string(),
            },
            CoreError::Config { message } => CliError::Settings { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Settings {
            message: err.to_string(),
        }
    }
}
