//! Flag-aware config resolution on top of `frontity_config`.
//!
//! Precedence: CLI flag > env var > profile > defaults.

use std::time::Duration;

use secrecy::SecretString;

use frontity_config::{Config, Profile, config_path, load_config_or_default};
use frontity_core::{Platform, RedirectionMode, RouterConfig, SourceConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a data command needs to build a `Source` and a `Router`.
#[derive(Debug)]
pub struct Site {
    pub profile: String,
    pub source: SourceConfig,
    /// Router template; commands set the platform and initial link.
    pub router: RouterConfig,
}

impl Site {
    /// The router config for `platform` starting at `initial_link`.
    pub fn router_config(
        &self,
        platform: Platform,
        initial_link: &str,
        auto_fetch: bool,
    ) -> RouterConfig {
        RouterConfig {
            auto_fetch,
            platform,
            initial_link: initial_link.to_owned(),
            options: self.router.options.clone(),
        }
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the site from the config file, the active profile and flag overrides.
pub fn resolve_site(global: &GlobalOpts) -> Result<Site, CliError> {
    let cfg = load_config_or_default();
    resolve_site_from(global, &cfg)
}

pub fn resolve_site_from(global: &GlobalOpts, cfg: &Config) -> Result<Site, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let (mut source, router) = if let Some(profile) = cfg.profiles.get(&profile_name) {
        let mut source =
            frontity_config::profile_to_source_config(profile, &profile_name, &cfg.defaults)?;
        if let Some(ref url) = global.url {
            source.frontity_url = parse_url("url", url)?;
        }
        let router =
            frontity_config::profile_to_router_config(profile, Platform::Server, "/", true);
        (source, router)
    } else if let Some(ref url) = global.url {
        let mut source = SourceConfig::new(parse_url("url", url)?);
        source.timeout = Duration::from_secs(cfg.defaults.timeout);
        if cfg.defaults.insecure {
            source.tls = TlsVerification::DangerAcceptInvalid;
        }
        (source, RouterConfig::default())
    } else if global.profile.is_some() {
        return Err(profile_not_found(&profile_name, cfg));
    } else {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };

    apply_overrides(&mut source, global)?;

    Ok(Site {
        profile: profile_name,
        source,
        router,
    })
}

/// The named profile, or a `ProfileNotFound` listing the others.
pub fn find_profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    cfg.profiles
        .get(name)
        .ok_or_else(|| profile_not_found(name, cfg))
}

fn apply_overrides(source: &mut SourceConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref url) = global.source_url {
        source.url = Some(parse_url("source-url", url)?);
    }
    if let Some(ref api) = global.api {
        source.api = Some(parse_url("api", api)?);
    }
    if let Some(ref mode) = global.redirections {
        source.redirections = mode
            .parse::<RedirectionMode>()
            .map_err(|e| CliError::Validation {
                field: "redirections".into(),
                reason: e.to_string(),
            })?;
    }
    if let Some(ref token) = global.preview_token {
        source.preview_token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        source.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        source.timeout = Duration::from_secs(secs);
    }
    Ok(())
}

fn profile_not_found(name: &str, cfg: &Config) -> CliError {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    names.sort_unstable();
    CliError::ProfileNotFound {
        name: name.into(),
        available: if names.is_empty() {
            "(none)".into()
        } else {
            names.join(", ")
        },
    }
}

fn parse_url(field: &str, value: &str) -> Result<url::Url, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {value}"),
    })
}
