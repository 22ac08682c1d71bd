// ── Core error types ──
//
// Failures inside the source and router. Callers of `Source::fetch` never
// see these: the fetcher folds them into error descriptors. They surface
// directly only from construction (bad config) and from the CLI helpers.
// The `From<frontity_api::Error>` impl translates transport-layer errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach WordPress at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── HTTP errors ──────────────────────────────────────────────────
    #[error("HTTP {status} {status_text}")]
    Http {
        status: u16,
        status_text: String,
        /// WordPress error code (e.g. `rest_post_invalid_page_number`).
        code: Option<String>,
    },

    #[error("Redirected ({status}) to {location}")]
    Redirected { status: u16, location: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {link}")]
    NotFound { link: String },

    #[error("Malformed link '{link}': {reason}")]
    MalformedLink { link: String, reason: String },

    #[error("Redirection loop starting at {link} ({hops} hops)")]
    RedirectLoop { link: String, hops: usize },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Status used for failures that never produced an HTTP answer.
pub const NETWORK_FAILURE_STATUS: u16 = 500;

/// Status used for redirection loops (RFC 5842 "Loop Detected").
pub const LOOP_DETECTED_STATUS: u16 = 508;

impl CoreError {
    /// The `(status, status_text)` pair stored in an error descriptor.
    pub fn status(&self) -> (u16, String) {
        match self {
            Self::Http {
                status,
                status_text,
                ..
            } => (*status, status_text.clone()),
            Self::NotFound { .. } | Self::MalformedLink { .. } => (404, "Not Found".into()),
            Self::RedirectLoop { .. } => (LOOP_DETECTED_STATUS, "Loop Detected".into()),
            Self::Redirected { status, .. } => (*status, self.to_string()),
            Self::ConnectionFailed { .. }
            | Self::Timeout { .. }
            | Self::Config { .. }
            | Self::Internal(_) => (NETWORK_FAILURE_STATUS, self.to_string()),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<frontity_api::Error> for CoreError {
    fn from(err: frontity_api::Error) -> Self {
        match err {
            frontity_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if let Some(status) = e.status() {
                    CoreError::Http {
                        status: status.as_u16(),
                        status_text: status.canonical_reason().unwrap_or("Unknown").into(),
                        code: None,
                    }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                }
            }
            frontity_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            frontity_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            frontity_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            frontity_api::Error::Http {
                status,
                status_text,
                code,
                message: _,
            } => CoreError::Http {
                status,
                status_text,
                code,
            },
            frontity_api::Error::Redirect { status, location } => {
                CoreError::Redirected { status, location }
            }
            frontity_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            frontity_api::Error::InvalidHeader { name, value } => {
                CoreError::Internal(format!("Invalid header {name}: {value}"))
            }
        }
    }
}
