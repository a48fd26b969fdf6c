// ── Core error types ──
//
// Errors returned by the reconciliation engine and its collaborators.
// Callers never see reqwest or serde errors directly: the
// `From<routekeeper_api::Error>` impl folds admin API failures into
// proxy-apply variants, and store failures carry the offending path.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used by boundary layers to pick a response class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed a malformed domain.
    Validation,
    /// The proxy rejected the change or could not be reached.
    ProxyApply,
    /// The caller asked to remove a route that does not exist.
    NotFound,
    /// Reading or writing the persisted document failed.
    Io,
    /// Process configuration is unusable.
    Config,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Caller errors ────────────────────────────────────────────────
    #[error("{domain} is not a valid domain")]
    Validation { domain: String },

    #[error("No route exists for {domain}")]
    NotFound { domain: String },

    // ── Proxy errors ─────────────────────────────────────────────────
    #[error("Caddy rejected {target}: {message}")]
    ProxyApply { target: String, message: String },

    #[error("Cannot reach Caddy admin API at {url}: {reason}")]
    ProxyUnavailable { url: String, reason: String },

    // ── Persistence errors ───────────────────────────────────────────
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config document {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ProxyApply { .. } | Self::ProxyUnavailable { .. } => ErrorKind::ProxyApply,
            Self::Io { .. } | Self::Parse { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// `true` for errors caused by the caller's input (4xx class);
    /// everything else is a server-side failure (5xx class).
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }

    /// Attach the domain being applied to a proxy rejection.
    pub(crate) fn for_target(self, target: &str) -> Self {
        match self {
            Self::ProxyApply { message, .. } => Self::ProxyApply {
                target: target.to_owned(),
                message,
            },
            other => other,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<routekeeper_api::Error> for CoreError {
    fn from(err: routekeeper_api::Error) -> Self {
        if err.is_unreachable() {
            let url = match &err {
                routekeeper_api::Error::Transport(e) => {
                    e.url().map(ToString::to_string).unwrap_or_default()
                }
                _ => String::new(),
            };
            return CoreError::ProxyUnavailable {
                url,
                reason: err.to_string(),
            };
        }

        match err {
            routekeeper_api::Error::Rejected { status, message } => CoreError::ProxyApply {
                target: "configuration".into(),
                message: format!("HTTP {status}: {message}"),
            },
            routekeeper_api::Error::Transport(e) => CoreError::ProxyApply {
                target: "configuration".into(),
                message: format!("admin request failed: {e}"),
            },
            routekeeper_api::Error::Timeout { timeout_secs } => CoreError::ProxyUnavailable {
                url: String::new(),
                reason: format!("request timed out after {timeout_secs}s"),
            },
            routekeeper_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid admin URL: {e}"),
            },
            routekeeper_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup for admin API failed: {msg}"),
            },
            routekeeper_api::Error::Deserialization { message, body: _ } => {
                CoreError::ProxyApply {
                    target: "admin response".into(),
                    message: format!("unreadable response: {message}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_split_into_client_and_server_classes() {
        let validation = CoreError::Validation {
            domain: "not a domain".into(),
        };
        let not_found = CoreError::NotFound {
            domain: "never-added.example.com".into(),
        };
        let rejected = CoreError::ProxyApply {
            target: "shop.example.com".into(),
            message: "HTTP 400: bad dial".into(),
        };
        let io = CoreError::io("domains/caddy.json", std::io::Error::other("disk full"));

        assert!(validation.is_client_error());
        assert!(not_found.is_client_error());
        assert!(!rejected.is_client_error());
        assert!(!io.is_client_error());
        assert_eq!(io.kind(), ErrorKind::Io);
        assert_eq!(
            validation.to_string(),
            "not a domain is not a valid domain"
        );
    }

    #[test]
    fn rejection_maps_to_proxy_apply_with_target() {
        let err: CoreError = routekeeper_api::Error::Rejected {
            status: 400,
            message: "missing port in address".into(),
        }
        .into();
        let err = err.for_target("shop.example.com");

        assert_eq!(err.kind(), ErrorKind::ProxyApply);
        assert_eq!(
            err.to_string(),
            "Caddy rejected shop.example.com: HTTP 400: missing port in address"
        );
    }
}
