use thiserror::Error;

/// Top-level error type for the `frontity-api` crate.
///
/// Covers every failure mode of a REST round-trip: transport, HTTP
/// status, redirects (the client never follows them) and payload decoding.
/// `frontity-core` turns these into error descriptors.
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

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-success status. WordPress answers with a
    /// `{ code, message, data: { status } }` body that is kept when present.
    #[error("HTTP {status} {status_text}")]
    Http {
        status: u16,
        status_text: String,
        code: Option<String>,
        message: Option<String>,
    },

    /// 3xx answer with a `Location` header.
    #[error("Redirected ({status}) to {location}")]
    Redirect { status: u16, location: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A pagination header was present but not a number.
    #[error("Invalid header {name}: {value}")]
    InvalidHeader { name: &'static str, value: String },
}

impl Error {
    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Redirect { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the request never produced an HTTP answer.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } | Self::Tls(_) => true,
            _ => false,
        }
    }

    /// Extract the WordPress error code (e.g. `rest_post_invalid_page_number`).
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
