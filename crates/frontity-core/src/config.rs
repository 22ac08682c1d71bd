// ── Runtime source and router configuration ──
//
// These types describe *where* the WordPress content lives and how the
// router behaves. They carry credentials and connection tuning, but never
// touch disk. The CLI (through frontity-config) builds them and hands them in.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use frontity_api::WP_COM_API_HOST;
use indexmap::IndexMap;
use regex::Regex;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::error::CoreError;

const WP_COM_SUFFIX: &str = ".wordpress.com";

/// Where the code is running. Decides whether history is touched and
/// whether redirections are chased on data changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Server,
    Client,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default for public WordPress sites.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed local installs).
    DangerAcceptInvalid,
}

/// When the fetcher consults the redirection rules.
///
/// Parsed from the same strings WordPress site owners put in their
/// settings: `"no"`, `"all"`, `"404"` or `"RegExp:<pattern>"`.
#[derive(Debug, Clone, Default)]
pub enum RedirectionMode {
    /// Never look for redirections.
    #[default]
    No,
    /// Look before every fetch.
    All,
    /// Look only when the content fetch ends in a 404.
    NotFound,
    /// Look before fetching links whose key matches the pattern.
    Pattern(Regex),
}

impl RedirectionMode {
    /// Whether rules must be consulted before fetching `key`.
    pub fn check_before_fetch(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Pattern(re) => re.is_match(key),
            Self::No | Self::NotFound => false,
        }
    }

    /// Whether rules must be consulted after a 404 for `key`.
    pub fn check_after_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl PartialEq for RedirectionMode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::No, Self::No) | (Self::All, Self::All) | (Self::NotFound, Self::NotFound) => {
                true
            }
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for RedirectionMode {}

impl FromStr for RedirectionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no" | "" => Ok(Self::No),
            "all" => Ok(Self::All),
            "404" => Ok(Self::NotFound),
            other => {
                let pattern = other.strip_prefix("RegExp:").ok_or_else(|| CoreError::Config {
                    message: format!(
                        "invalid redirections mode '{other}': expected no, all, 404 or RegExp:<pattern>"
                    ),
                })?;
                let re = Regex::new(pattern).map_err(|e| CoreError::Config {
                    message: format!("invalid redirections pattern '{pattern}': {e}"),
                })?;
                Ok(Self::Pattern(re))
            }
        }
    }
}

impl fmt::Display for RedirectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::No => write!(f, "no"),
            Self::All => write!(f, "all"),
            Self::NotFound => write!(f, "404"),
            Self::Pattern(re) => write!(f, "RegExp:{}", re.as_str()),
        }
    }
}

/// A locally configured redirection (the static counterpart of a
/// redirection-plugin rule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRule {
    /// Path to match, or a regex when `regex` is set.
    pub source: String,
    /// Target link or absolute URL. Regex captures can be used as `$1`.
    pub target: String,
    /// 301, 302, 307 or 308.
    #[serde(default = "default_redirect_status")]
    pub status: u16,
    #[serde(default)]
    pub regex: bool,
    /// "Ignore and pass parameters": merge the request query onto the target.
    #[serde(default)]
    pub pass_params: bool,
}

fn default_redirect_status() -> u16 {
    301
}

/// A post type reachable by slug (`posts`, `pages`, `media`, custom types).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTypeConfig {
    /// Entity type, e.g. `post` or `movie`.
    #[serde(rename = "type")]
    pub post_type: String,
    /// REST endpoint, e.g. `posts` or `movies`.
    pub endpoint: String,
    /// Archive path, e.g. `/movies`. `None` if the type has no archive.
    #[serde(default)]
    pub archive: Option<String>,
}

/// A custom taxonomy with its own archive path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    /// Taxonomy name, e.g. `actor`. Also the path base (`/actor/:slug/`).
    pub taxonomy: String,
    /// REST endpoint for the terms, e.g. `actors`.
    pub endpoint: String,
    /// Endpoint listing the entities of a term (defaults to `posts`).
    #[serde(default = "default_post_type_endpoint")]
    pub post_type_endpoint: String,
}

fn default_post_type_endpoint() -> String {
    "posts".into()
}

/// Configuration of the WordPress source.
///
/// Built by the CLI, passed to [`Source`](crate::Source) -- core never reads config files.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Public URL of the Frontity site.
    pub frontity_url: Url,
    /// WordPress URL, when it differs from `frontity_url`.
    pub url: Option<Url>,
    /// Explicit REST API root; derived from the URLs when absent.
    pub api: Option<Url>,
    /// REST prefix for self-hosted sites (`/wp-json`).
    pub prefix: String,
    /// Force the WordPress.com API shape.
    pub is_wp_com: bool,
    pub category_base: String,
    pub tag_base: String,
    pub author_base: String,
    /// Custom post types, tried after posts, pages and media.
    pub post_types: Vec<PostTypeConfig>,
    pub taxonomies: Vec<TaxonomyConfig>,
    pub redirections: RedirectionMode,
    pub redirect_rules: Vec<RedirectRule>,
    /// `per_page` sent on archive requests (server default when `None`).
    pub per_page: Option<u32>,
    /// Bearer token for previews.
    pub preview_token: Option<SecretString>,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl SourceConfig {
    /// A config with WordPress defaults for a site served at `frontity_url`.
    pub fn new(frontity_url: Url) -> Self {
        Self {
            frontity_url,
            url: None,
            api: None,
            prefix: "/wp-json".into(),
            is_wp_com: false,
            category_base: "category".into(),
            tag_base: "tag".into(),
            author_base: "author".into(),
            post_types: Vec::new(),
            taxonomies: Vec::new(),
            redirections: RedirectionMode::No,
            redirect_rules: Vec::new(),
            per_page: None,
            preview_token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Whether the API is the WordPress.com flavour.
    pub fn is_wp_com(&self) -> bool {
        if self.is_wp_com {
            return true;
        }
        match self.api {
            Some(ref api) => api.host_str() == Some(WP_COM_API_HOST),
            None => self.url.as_ref().is_some_and(is_wp_com_host),
        }
    }

    /// REST API root, always ending with `/`.
    ///
    /// - explicit `api` wins
    /// - WordPress.com: `https://public-api.wordpress.com/wp/v2/sites/<host>/`
    /// - otherwise `<url or frontity_url><prefix>/`
    pub fn api_url(&self) -> Result<Url, CoreError> {
        if let Some(ref api) = self.api {
            return Ok(api.clone());
        }

        let base = self.url.as_ref().unwrap_or(&self.frontity_url);

        if self.is_wp_com || is_wp_com_host(base) {
            let host = base.host_str().ok_or_else(|| CoreError::Config {
                message: format!("WordPress.com URL has no host: {base}"),
            })?;
            return Url::parse(&format!("https://{WP_COM_API_HOST}/wp/v2/sites/{host}/"))
                .map_err(|e| config_error("api", &e));
        }

        let prefix = self.prefix.trim_matches('/');
        let relative = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        with_final_slash(base)
            .join(&relative)
            .map_err(|e| config_error("api", &e))
    }

    /// WordPress URL: `url`, else derived from `api`, else `frontity_url`.
    pub fn source_url(&self) -> Url {
        if let Some(ref url) = self.url {
            return with_final_slash(url);
        }

        if let Some(ref api) = self.api {
            if api.host_str() == Some(WP_COM_API_HOST) {
                let domain = api
                    .path()
                    .split_once("/sites/")
                    .map(|(_, rest)| rest.trim_matches('/'))
                    .filter(|d| !d.is_empty());
                if let Some(url) = domain.and_then(|d| Url::parse(&format!("https://{d}/")).ok())
                {
                    return url;
                }
            } else {
                let suffix = format!("/{}/", self.prefix.trim_matches('/'));
                let mut url = api.clone();
                if let Some(root) = api.path().strip_suffix(suffix.as_str()) {
                    url.set_path(&format!("{root}/"));
                }
                url.set_query(None);
                return url;
            }
        }

        with_final_slash(&self.frontity_url)
    }

    /// Post types tried when resolving a single entity by slug, in order.
    pub fn post_type_endpoints(&self) -> Vec<PostTypeConfig> {
        let mut types = vec![
            PostTypeConfig {
                post_type: "post".into(),
                endpoint: "posts".into(),
                archive: None,
            },
            PostTypeConfig {
                post_type: "page".into(),
                endpoint: "pages".into(),
                archive: None,
            },
            PostTypeConfig {
                post_type: "attachment".into(),
                endpoint: "media".into(),
                archive: None,
            },
        ];
        types.extend(self.post_types.iter().cloned());
        types
    }
}

/// Configuration of the router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Fetch data automatically when the link changes.
    pub auto_fetch: bool,
    pub platform: Platform,
    /// The first link (the request URL on the server).
    pub initial_link: String,
    /// App options re-sent as `frontity_<key>` params on SSR redirects.
    pub options: IndexMap<String, String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            platform: Platform::Server,
            initial_link: "/".into(),
            options: IndexMap::new(),
        }
    }
}

fn is_wp_com_host(url: &Url) -> bool {
    url.host_str().is_some_and(|h| h.ends_with(WP_COM_SUFFIX))
}

fn with_final_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn config_error(field: &str, err: &url::ParseError) -> CoreError {
    CoreError::Config {
        message: format!("cannot derive {field} URL: {err}"),
    }
}
