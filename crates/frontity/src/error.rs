//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use frontity_config::ConfigError;
use frontity_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REDIRECT: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach WordPress at {url}: {reason}")]
    #[diagnostic(
        code(frontity::connection_failed),
        help(
            "Check that the site is up and the REST API is reachable.\n\
             Inspect the derived URLs with: frontity api"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(frontity::timeout),
        help("Increase the timeout with --timeout or check the site's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Link results ─────────────────────────────────────────────────
    #[error("{link} answered {status} {status_text}")]
    #[diagnostic(code(frontity::link_failed))]
    LinkFailed {
        link: String,
        status: u16,
        status_text: String,
    },

    #[error("{link} did not settle within {seconds}s")]
    #[diagnostic(
        code(frontity::not_settled),
        help("Raise the limit with --wait.")
    )]
    NotSettled { link: String, seconds: u64 },

    #[error("Redirection loop starting at {link}")]
    #[diagnostic(
        code(frontity::redirect_loop),
        help("Check the redirection rules of the site.")
    )]
    RedirectLoop { link: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(frontity::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(frontity::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: frontity config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No site configured")]
    #[diagnostic(
        code(frontity::no_config),
        help(
            "Pass --url <site>, or create a profile with: frontity config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(frontity::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Prompt failed: {0}")]
    #[diagnostic(code(frontity::prompt))]
    Prompt(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(frontity::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } | Self::NotSettled { .. } => exit_code::TIMEOUT,
            Self::LinkFailed { status, .. } => match status {
                404 => exit_code::NOT_FOUND,
                500 => exit_code::CONNECTION,
                _ => exit_code::GENERAL,
            },
            Self::RedirectLoop { .. } => exit_code::REDIRECT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            Self::Config(ConfigError::ProfileNotFound { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Http {
                status,
                status_text,
                code: _,
            } => CliError::LinkFailed {
                link: String::new(),
                status,
                status_text,
            },

            CoreError::NotFound { link } => CliError::LinkFailed {
                link,
                status: 404,
                status_text: "Not Found".into(),
            },

            CoreError::MalformedLink { link, reason } => CliError::Validation {
                field: format!("link '{link}'"),
                reason,
            },

            CoreError::RedirectLoop { link, hops: _ } => CliError::RedirectLoop { link },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            other @ (CoreError::Redirected { .. } | CoreError::Internal(_)) => {
                CliError::Internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_statuses_pick_exit_codes() {
        let failed = |status| CliError::LinkFailed {
            link: "/a/".into(),
            status,
            status_text: String::new(),
        };
        assert_eq!(failed(404).exit_code(), exit_code::NOT_FOUND);
        assert_eq!(failed(500).exit_code(), exit_code::CONNECTION);
        assert_eq!(failed(403).exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn core_errors_map_to_cli_errors() {
        let err = CliError::from(CoreError::RedirectLoop {
            link: "/x/".into(),
            hops: 11,
        });
        assert_eq!(err.exit_code(), exit_code::REDIRECT);

        let err = CliError::from(CoreError::Timeout { timeout_secs: 30 });
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);

        let err = CliError::from(ConfigError::ProfileNotFound { name: "x".into() });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
