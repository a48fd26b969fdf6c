use thiserror::Error;

/// Top-level error type for the `routekeeper-api` crate.
///
/// Covers every failure mode of the admin API surface: transport,
/// URL construction, rejection by Caddy, and response decoding.
/// `routekeeper-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup error while building the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Admin API ───────────────────────────────────────────────────
    /// Caddy refused the request (parsed from the `{"error": "..."}` body).
    #[error("Caddy admin API rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if Caddy answered but refused the change.
    ///
    /// Rejections are a normal outcome of applying a bad route (for example
    /// an unparseable upstream); anything else means the admin API could not
    /// be reached or spoke garbage.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns `true` if the admin endpoint could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// HTTP status returned by the admin API, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
