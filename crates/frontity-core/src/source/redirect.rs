// ── Redirection rules ──
//
// The fetcher asks a `RedirectionRules` implementation whether a link is
// redirected before (or after) fetching its content. `HeadProbe` asks the
// WordPress front-end itself with a non-following HEAD request, which is
// how redirection plugins are observed from outside. `StaticRules`
// evaluates locally configured rules.

use async_trait::async_trait;
use frontity_api::WpClient;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::config::RedirectRule;
use crate::error::CoreError;
use crate::link::Link;

/// Statuses a redirection rule may answer with.
pub const REDIRECT_STATUSES: [u16; 4] = [301, 302, 307, 308];

/// A matched redirection: target (site-relative or absolute) and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: u16,
}

/// Source of redirection rules consulted by the fetcher.
#[async_trait]
pub trait RedirectionRules: Send + Sync {
    /// The redirection for `link`, if any.
    async fn lookup(&self, link: &Link) -> Result<Option<Redirect>, CoreError>;
}

/// Never redirects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRules;

#[async_trait]
impl RedirectionRules for NoRules {
    async fn lookup(&self, _link: &Link) -> Result<Option<Redirect>, CoreError> {
        Ok(None)
    }
}

// ── HEAD probe ───────────────────────────────────────────────────────

/// Probes `<wordpress url><link>` with a HEAD request that does not follow
/// redirects.
#[derive(Debug, Clone)]
pub struct HeadProbe {
    client: WpClient,
    base: Url,
}

impl HeadProbe {
    pub fn new(client: WpClient, base: Url) -> Self {
        Self { client, base }
    }

    fn target(&self, link: &Link) -> Result<Url, CoreError> {
        let relative = link.key();
        self.base
            .join(relative.trim_start_matches('/'))
            .map_err(|e| CoreError::MalformedLink {
                link: relative,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl RedirectionRules for HeadProbe {
    async fn lookup(&self, link: &Link) -> Result<Option<Redirect>, CoreError> {
        let url = self.target(link)?;
        let hop = self.client.probe_redirect(url).await?;
        Ok(hop.map(|hop| {
            debug!(link = %link, location = %hop.location, status = hop.status, "redirection found");
            Redirect {
                location: hop.location.to_string(),
                status: hop.status,
            }
        }))
    }
}

// ── Static rules ─────────────────────────────────────────────────────

#[derive(Debug)]
enum Matcher {
    /// Canonical path, or canonical key when the source has a query.
    Path(String),
    Pattern(Regex),
}

#[derive(Debug)]
struct CompiledRule {
    matcher: Matcher,
    /// Match against the full key (path plus sorted query).
    with_query: bool,
    target: String,
    status: u16,
    pass_params: bool,
}

/// Locally configured rules, evaluated in order. First match wins.
#[derive(Debug, Default)]
pub struct StaticRules {
    rules: Vec<CompiledRule>,
}

impl StaticRules {
    pub fn new(rules: &[RedirectRule]) -> Result<Self, CoreError> {
        let rules = rules
            .iter()
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Synchronous evaluation.
    pub fn evaluate(&self, link: &Link) -> Option<Redirect> {
        let path = link.path_and_page();
        let key = link.key();
        self.rules.iter().find_map(|rule| {
            let subject = if rule.with_query { &key } else { &path };
            let target = match rule.matcher {
                Matcher::Path(ref source) if source == subject => rule.target.clone(),
                Matcher::Path(_) => return None,
                Matcher::Pattern(ref re) => {
                    let caps = re.captures(subject)?;
                    let mut expanded = String::new();
                    caps.expand(&rule.target, &mut expanded);
                    expanded
                }
            };
            let location = if rule.pass_params {
                pass_params(&target, link)
            } else {
                target
            };
            Some(Redirect {
                location,
                status: rule.status,
            })
        })
    }
}

#[async_trait]
impl RedirectionRules for StaticRules {
    async fn lookup(&self, link: &Link) -> Result<Option<Redirect>, CoreError> {
        Ok(self.evaluate(link))
    }
}

fn compile(rule: &RedirectRule) -> Result<CompiledRule, CoreError> {
    if !REDIRECT_STATUSES.contains(&rule.status) {
        return Err(CoreError::Config {
            message: format!(
                "redirect rule '{}' has status {}, expected one of 301, 302, 307, 308",
                rule.source, rule.status
            ),
        });
    }

    let (matcher, with_query) = if rule.regex {
        let re = Regex::new(&rule.source).map_err(|e| CoreError::Config {
            message: format!("invalid redirect pattern '{}': {e}", rule.source),
        })?;
        (Matcher::Pattern(re), rule.source.contains(r"\?"))
    } else {
        let source = Link::parse(&rule.source)?;
        if source.query.is_empty() {
            (Matcher::Path(source.path_and_page()), false)
        } else {
            (Matcher::Path(source.key()), true)
        }
    };

    Ok(CompiledRule {
        matcher,
        with_query,
        target: rule.target.clone(),
        status: rule.status,
        pass_params: rule.pass_params,
    })
}

/// Merge the query of `link` onto `target`. Parameters already on the
/// target win.
fn pass_params(target: &str, link: &Link) -> String {
    if link.query.is_empty() {
        return target.to_owned();
    }
    if let Ok(mut url) = Url::parse(target) {
        let existing: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &link.query {
                if !existing.contains(k) {
                    pairs.append_pair(k, v);
                }
            }
        }
        return url.to_string();
    }
    match Link::parse(target) {
        Ok(mut parsed) => {
            parsed.merge_query(&link.query);
            parsed.key()
        }
        Err(_) => target.to_owned(),
    }
}
