// ── Source: fetcher and merger ──
//
// Owns the WordPress client, the store and the redirection rules. Reads
// (`get`, `entity`) are pure lookups; `fetch` resolves a link through the
// route handlers, merges the entities and writes the final descriptor.
// Failures never escape `fetch`: they become error descriptors.

mod handlers;
pub mod redirect;

pub use redirect::{
    HeadProbe, NoRules, REDIRECT_STATUSES, Redirect, RedirectionRules, StaticRules,
};

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use frontity_api::{TlsMode, TransportConfig, WpClient};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{RedirectionMode, SourceConfig, TlsVerification};
use crate::error::CoreError;
use crate::link::{Link, LinkError, LinkNormalizer};
use crate::model::{Data, Entity, ItemRef, RedirectionData, extract_entities};
use crate::store::{DataChange, Store};

/// Options of [`Source::fetch_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Fetch again even if the descriptor is ready.
    pub force: bool,
}

type InFlight = Shared<BoxFuture<'static, ()>>;

struct SourceInner {
    config: SourceConfig,
    client: WpClient,
    links: LinkNormalizer,
    /// Origins whose absolute URLs are internal links.
    site_origins: Vec<url::Origin>,
    store: Store,
    rules: Arc<dyn RedirectionRules>,
    in_flight: DashMap<String, InFlight>,
}

/// Handle to the WordPress source. Cheap to clone.
#[derive(Clone)]
pub struct Source {
    inner: Arc<SourceInner>,
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("api", &self.inner.client.api().as_str())
            .field("data", &self.inner.store.data.len())
            .field("entities", &self.inner.store.entities.len())
            .finish_non_exhaustive()
    }
}

impl Source {
    // ── Construction ─────────────────────────────────────────────────

    /// Build the HTTP client from `config` and create a source.
    pub fn new(config: SourceConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_mode(&config.tls),
            timeout: config.timeout,
        };
        let client = WpClient::new(config.api_url()?, config.is_wp_com(), &transport)?;
        Self::with_client(config, client)
    }

    /// Create a source around an existing client. The preview token of
    /// `config`, if any, is attached to it.
    pub fn with_client(config: SourceConfig, client: WpClient) -> Result<Self, CoreError> {
        let client = match config.preview_token {
            Some(ref token) => client.with_auth(token.clone()),
            None => client,
        };
        let rules = default_rules(&config, &client)?;
        Ok(Self::from_parts(config, client, rules, Store::new()))
    }

    /// Assemble a source from its parts, e.g. a store hydrated from a
    /// server snapshot.
    pub fn from_parts(
        config: SourceConfig,
        client: WpClient,
        rules: Arc<dyn RedirectionRules>,
        store: Store,
    ) -> Self {
        let source_url = config.source_url();
        let mut site_origins = vec![source_url.origin()];
        let frontity_origin = config.frontity_url.origin();
        if !site_origins.contains(&frontity_origin) {
            site_origins.push(frontity_origin);
        }

        info!(
            api = %client.api(),
            source = %source_url,
            redirections = %config.redirections,
            "source ready"
        );

        Self {
            inner: Arc::new(SourceInner {
                links: LinkNormalizer::new(source_url),
                config,
                client,
                site_origins,
                store,
                rules,
                in_flight: DashMap::new(),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &SourceConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &WpClient {
        &self.inner.client
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn normalizer(&self) -> &LinkNormalizer {
        &self.inner.links
    }

    /// Canonical key of `link`.
    pub fn normalize(&self, link: &str) -> Result<String, LinkError> {
        self.inner.links.normalize(link)
    }

    /// Subscribe to descriptor writes.
    pub fn subscribe(&self) -> broadcast::Receiver<DataChange> {
        self.inner.store.data.subscribe()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The descriptor of `link`.
    ///
    /// Unknown links get a fresh status-only descriptor; the store is not
    /// touched. Known links return the stored `Arc`, whatever spelling
    /// of the link was used.
    pub fn get(&self, link: &str) -> Arc<Data> {
        match self.inner.links.parse(link) {
            Ok(parsed) => self
                .inner
                .store
                .data
                .get(&parsed.key())
                .unwrap_or_else(|| Arc::new(Data::status(&parsed))),
            Err(_) => self
                .inner
                .store
                .data
                .get(link)
                .unwrap_or_else(|| Arc::new(Data::unparsed(link))),
        }
    }

    pub fn entity(&self, entity_type: &str, id: u64) -> Option<Arc<Entity>> {
        self.inner.store.entities.get(entity_type, id)
    }

    /// The entities a descriptor points at, in order.
    pub fn resolve(&self, data: &Data) -> Vec<Arc<Entity>> {
        self.inner.store.resolve(data)
    }

    // ── Fetching ─────────────────────────────────────────────────────

    /// Fetch `link` unless its descriptor is already settled.
    pub async fn fetch(&self, link: &str) {
        self.fetch_with(link, FetchOptions::default()).await;
    }

    /// Fetch `link`. Concurrent calls for the same canonical link share
    /// one request.
    pub async fn fetch_with(&self, link: &str, options: FetchOptions) {
        let parsed = match self.inner.links.parse(link) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(link, error = %err, "cannot fetch malformed link");
                let (status, text) = CoreError::from(err).status();
                self.inner
                    .store
                    .data
                    .insert(Data::unparsed(link).error(status, text));
                return;
            }
        };
        let key = parsed.key();

        if !options.force && self.is_settled(&key) {
            debug!(link = %key, "already fetched");
            return;
        }

        let shared = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!(link = %key, "joining in-flight fetch");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // A fetch may have settled between the check and the lock.
                if !options.force && self.is_settled(&key) {
                    return;
                }
                let this = self.clone();
                let done_key = key.clone();
                let fut = async move {
                    this.run_fetch(parsed).await;
                    this.inner.in_flight.remove(&done_key);
                }
                .boxed()
                .shared();
                entry.insert(fut.clone());
                fut
            }
        };

        shared.await;
    }

    fn is_settled(&self, key: &str) -> bool {
        self.inner
            .store
            .data
            .get(key)
            .is_some_and(|data| data.is_ready || data.is_redirection())
    }

    async fn run_fetch(&self, link: Link) {
        let key = link.key();
        let store = &self.inner.store;
        let mode = &self.inner.config.redirections;
        let base = Data::status(&link);

        store.data.insert(base.clone().fetching());
        debug!(link = %key, "fetching");

        if mode.check_before_fetch(&key) {
            if let Some(redirection) = self.find_redirection(&link).await {
                store.data.insert(base.redirection(redirection));
                store.touch();
                return;
            }
        }

        let data = match handlers::resolve(self, &link).await {
            Ok(kind) => base.settled(kind),
            Err(CoreError::Redirected { status, location }) => {
                base.redirection(self.redirection_data(&location, Some(status)))
            }
            Err(err) => {
                let (status, text) = err.status();
                if status == 404 && mode.check_after_not_found() {
                    if let Some(redirection) = self.find_redirection(&link).await {
                        store.data.insert(base.redirection(redirection));
                        store.touch();
                        return;
                    }
                }
                debug!(link = %key, status, error = %err, "fetch failed");
                base.error(status, text)
            }
        };

        store.data.insert(data);
        store.touch();
    }

    async fn find_redirection(&self, link: &Link) -> Option<RedirectionData> {
        match self.inner.rules.lookup(link).await {
            Ok(found) => found.map(|r| self.redirection_data(&r.location, Some(r.status))),
            Err(err) => {
                warn!(link = %link, error = %err, "redirection lookup failed");
                None
            }
        }
    }

    /// Classify a redirect target: URLs on the WordPress or Frontity
    /// origin become internal links, anything else stays absolute.
    fn redirection_data(&self, location: &str, status: Option<u16>) -> RedirectionData {
        let internal = match Url::parse(location) {
            Ok(url) => self.inner.site_origins.contains(&url.origin()),
            Err(_) => true,
        };

        let location = if internal {
            self.inner
                .links
                .normalize(location)
                .unwrap_or_else(|_| location.to_owned())
        } else {
            location.to_owned()
        };

        RedirectionData {
            location,
            redirect_status: status,
            is_external: !internal,
        }
    }

    // ── Merging (handlers) ───────────────────────────────────────────

    /// Merge a REST object and its embedded resources. Returns the
    /// reference to the object itself.
    pub(crate) fn merge_value(&self, value: &Value, fallback_type: &str) -> Option<ItemRef> {
        let mut entities = extract_entities(value, fallback_type, &self.inner.links).into_iter();
        let primary = self.inner.store.entities.merge(entities.next()?);
        for embedded in entities {
            self.inner.store.entities.merge(embedded);
        }
        Some(ItemRef {
            id: primary.id,
            entity_type: primary.entity_type.clone(),
            link: primary.link.clone().unwrap_or_default(),
        })
    }

    pub(crate) fn merge_items(&self, values: &[Value], fallback_type: &str) -> Vec<ItemRef> {
        values
            .iter()
            .filter_map(|v| self.merge_value(v, fallback_type))
            .collect()
    }

    /// Merge raw fields over an existing entity.
    pub(crate) fn merge_fields(&self, entity_type: &str, id: u64, fields: serde_json::Map<String, Value>) {
        self.inner.store.entities.merge(Entity {
            entity_type: entity_type.to_owned(),
            id,
            link: None,
            fields,
        });
    }

    pub(crate) fn set_metadata(&self, kind: &str, slug: &str, value: Value) {
        self.inner.store.entities.set_metadata(kind, slug, value);
    }

    // ── Router hooks ─────────────────────────────────────────────────

    /// Store an error descriptor for `key`.
    pub(crate) fn fail(&self, key: &str, status: u16, status_text: &str) {
        let base = match self.inner.links.parse(key) {
            Ok(link) => Data::status(&link),
            Err(_) => Data::unparsed(key),
        };
        self.inner.store.data.insert(base.error(status, status_text));
    }

    /// Mark the redirection stored under `key` as resolved.
    pub(crate) fn mark_redirection_resolved(&self, key: &str) {
        let pending = self
            .inner
            .store
            .data
            .get(key)
            .is_some_and(|d| d.is_redirection() && !d.is_ready);
        if pending {
            self.inner.store.data.update(key, |d| {
                let mut d = d.clone();
                d.is_ready = true;
                d
            });
        }
    }
}

fn tls_mode(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

/// Static rules when configured, otherwise probe the WordPress front-end
/// (unless redirections are off).
fn default_rules(
    config: &SourceConfig,
    client: &WpClient,
) -> Result<Arc<dyn RedirectionRules>, CoreError> {
    if !config.redirect_rules.is_empty() {
        return Ok(Arc::new(StaticRules::new(&config.redirect_rules)?));
    }
    if config.redirections == RedirectionMode::No {
        return Ok(Arc::new(NoRules));
    }
    Ok(Arc::new(HeadProbe::new(client.clone(), config.source_url())))
}
