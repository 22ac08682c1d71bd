// ── Link normalization ──
//
// Every link that reaches the source or the router goes through here
// first. The canonical form is the cache key of the data index:
//
//   /<path>/[page/<n>/][?<sorted query>]
//
// Absolute URLs pointing at the WordPress site (or anywhere else) collapse
// to their path, the trailing slash is always present, `page/1` disappears
// and query parameters are sorted by key.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Url, form_urlencoded};

use crate::error::CoreError;

static PAGE_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(.*/)page/(\d+)/?$").unwrap()
});

/// Placeholder origin used to resolve relative links.
const RELATIVE_BASE: &str = "http://frontity.local/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("malformed link '{link}': {reason}")]
    Malformed { link: String, reason: String },
}

impl From<LinkError> for CoreError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Malformed { link, reason } => CoreError::MalformedLink { link, reason },
        }
    }
}

/// A parsed, canonical link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Site-relative path without the page segment, always ending in `/`.
    pub path: String,
    /// Archive page, `1` when absent.
    pub page: u32,
    /// Decoded query parameters (sorted, last duplicate wins).
    pub query: BTreeMap<String, String>,
    /// Fragment including `#`, or empty. Not part of the key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
}

impl Link {
    /// Parse a link without any source URL to strip.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        LinkNormalizer::default().parse(input)
    }

    /// The route: the path without page and query.
    pub fn route(&self) -> &str {
        &self.path
    }

    /// Path plus page segment, without query.
    pub fn path_and_page(&self) -> String {
        if self.page > 1 {
            format!("{}page/{}/", self.path, self.page)
        } else {
            self.path.clone()
        }
    }

    /// Query re-serialized with keys in sorted order.
    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish()
    }

    /// The canonical cache key.
    pub fn key(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            self.path_and_page()
        } else {
            format!("{}?{query}", self.path_and_page())
        }
    }

    /// The key plus the fragment, for history entries.
    pub fn href(&self) -> String {
        format!("{}{}", self.key(), self.hash)
    }

    /// Path segments, without empty ones.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Add parameters that are not already present.
    pub fn merge_query<'a>(&mut self, extra: impl IntoIterator<Item = (&'a String, &'a String)>) {
        for (k, v) in extra {
            self.query.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Turns arbitrary URLs into canonical [`Link`]s relative to the source URL.
#[derive(Debug, Clone, Default)]
pub struct LinkNormalizer {
    source: Option<Url>,
}

impl LinkNormalizer {
    /// A normalizer that strips `source` (origin and subdirectory) from
    /// absolute links.
    pub fn new(source: Url) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    /// Normalize to the canonical cache key.
    pub fn normalize(&self, input: &str) -> Result<String, LinkError> {
        self.parse(input).map(|link| link.key())
    }

    /// Parse into a [`Link`].
    pub fn parse(&self, input: &str) -> Result<Link, LinkError> {
        let input = input.trim();
        let url = self.resolve(input)?;
        let path = self.site_relative_path(&url);

        let (path, page) = split_page(&path);

        let mut query = BTreeMap::new();
        for (k, v) in url.query_pairs() {
            query.insert(k.into_owned(), v.into_owned());
        }

        let hash = url.fragment().map(|f| format!("#{f}")).unwrap_or_default();

        Ok(Link {
            path,
            page,
            query,
            hash,
        })
    }

    fn resolve(&self, input: &str) -> Result<Url, LinkError> {
        let malformed = |reason: String| LinkError::Malformed {
            link: input.to_owned(),
            reason,
        };

        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            Ok(url) => Err(malformed(format!("unsupported scheme '{}'", url.scheme()))),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(RELATIVE_BASE).map_err(|e| malformed(e.to_string()))?;
                base.join(input).map_err(|e| malformed(e.to_string()))
            }
            Err(e) => Err(malformed(e.to_string())),
        }
    }

    /// Path of `url` with the source subdirectory removed when the URL
    /// points at the source site.
    fn site_relative_path(&self, url: &Url) -> String {
        let path = url.path();
        if let Some(ref source) = self.source {
            let prefix = source.path().trim_end_matches('/');
            if !prefix.is_empty() && url.origin() == source.origin() {
                if let Some(rest) = path.strip_prefix(prefix) {
                    if rest.is_empty() || rest.starts_with('/') {
                        return ensure_slashes(rest);
                    }
                }
            }
        }
        ensure_slashes(path)
    }
}

fn split_page(path: &str) -> (String, u32) {
    if let Some(caps) = PAGE_SEGMENT.captures(path) {
        if let (Some(prefix), Some(page)) = (caps.get(1), caps.get(2)) {
            if let Ok(page) = page.as_str().parse::<u32>() {
                return (prefix.as_str().to_owned(), page.max(1));
            }
        }
    }
    (path.to_owned(), 1)
}

fn ensure_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 2);
    if !path.starts_with('/') {
        out.push('/');
    }
    out.push_str(path);
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}
