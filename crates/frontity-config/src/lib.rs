//! Shared configuration for the Frontity CLI.
//!
//! TOML profiles, preview-token resolution (env + keyring + plaintext),
//! and translation to `frontity_core::SourceConfig` / `RouterConfig`.
//! The CLI adds flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use frontity_core::{
    Platform, PostTypeConfig, RedirectRule, RedirectionMode, RouterConfig, SourceConfig,
    TaxonomyConfig, TlsVerification,
};

/// Keyring service name.
pub const KEYRING_SERVICE: &str = "frontity";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named site profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The profile called `name`, or the default profile.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named site profile.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Public URL of the Frontity site (e.g., "https://example.com").
    pub frontity_url: String,

    /// WordPress URL, when it differs from the Frontity URL.
    pub url: Option<String>,

    /// Explicit REST API root.
    pub api: Option<String>,

    /// REST prefix for self-hosted sites (default "/wp-json").
    pub prefix: Option<String>,

    /// Force the WordPress.com API.
    #[serde(default)]
    pub is_wp_com: bool,

    pub category_base: Option<String>,
    pub tag_base: Option<String>,
    pub author_base: Option<String>,

    /// Custom post types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_types: Vec<PostTypeConfig>,

    /// Custom taxonomies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taxonomies: Vec<TaxonomyConfig>,

    /// "no", "all", "404" or "RegExp:<pattern>".
    pub redirections: Option<String>,

    /// Static redirection rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_rules: Vec<RedirectRule>,

    /// `per_page` for archive requests.
    pub per_page: Option<u32>,

    /// Preview token (plaintext; prefer keyring or env var).
    pub preview_token: Option<String>,

    /// Environment variable name containing the preview token.
    pub preview_token_env: Option<String>,

    /// App options sent as `frontity_<key>` on SSR redirects.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "frontity", "frontity").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("frontity");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the Config from `path` + environment (`FRONTITY_DEFAULTS__TIMEOUT=60`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FRONTITY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the preview token from the credential chain. `None` when no
/// source has one: previews then run unauthenticated.
pub fn resolve_preview_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's preview_token_env → env var lookup
    if let Some(ref env_name) = profile.preview_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .preview_token
        .as_ref()
        .map(|token| SecretString::from(token.clone()))
}

/// Store a preview token in the system keyring.
pub fn store_preview_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .and_then(|entry| entry.set_password(token))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/preview-token")
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `SourceConfig` from a profile, without CLI flag overrides.
pub fn profile_to_source_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SourceConfig, ConfigError> {
    let frontity_url = parse_url("frontity_url", &profile.frontity_url)?;
    let mut config = SourceConfig::new(frontity_url);

    config.url = profile
        .url
        .as_deref()
        .map(|u| parse_url("url", u))
        .transpose()?;
    config.api = profile
        .api
        .as_deref()
        .map(|u| parse_url("api", u))
        .transpose()?;
    if let Some(ref prefix) = profile.prefix {
        config.prefix.clone_from(prefix);
    }
    config.is_wp_com = profile.is_wp_com;

    if let Some(ref base) = profile.category_base {
        config.category_base = base.trim_matches('/').to_owned();
    }
    if let Some(ref base) = profile.tag_base {
        config.tag_base = base.trim_matches('/').to_owned();
    }
    if let Some(ref base) = profile.author_base {
        config.author_base = base.trim_matches('/').to_owned();
    }

    config.post_types.clone_from(&profile.post_types);
    config.taxonomies.clone_from(&profile.taxonomies);
    config.redirect_rules.clone_from(&profile.redirect_rules);
    config.redirections = match profile.redirections {
        Some(ref mode) => mode
            .parse::<RedirectionMode>()
            .map_err(|e| ConfigError::Validation {
                field: "redirections".into(),
                reason: e.to_string(),
            })?,
        None => RedirectionMode::No,
    };
    config.per_page = profile.per_page;
    config.preview_token = resolve_preview_token(profile, profile_name);

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(config)
}

/// Build a `RouterConfig` for a profile.
pub fn profile_to_router_config(
    profile: &Profile,
    platform: Platform,
    initial_link: &str,
    auto_fetch: bool,
) -> RouterConfig {
    RouterConfig {
        auto_fetch,
        platform,
        initial_link: initial_link.to_owned(),
        options: profile.options.clone(),
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    value.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {value}"),
    })
}
