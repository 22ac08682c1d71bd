// ── Router ──
//
// Owns the current link. `set` normalizes, chases known redirections,
// updates the history (client only), commits the link immediately and
// lets the fetch run in the background. A finished fetch is applied only
// if the committed link is still the one it was started for.

mod history;
mod ssr;

pub use history::{History, HistoryEntry, MemoryHistory};
pub use ssr::{DEFAULT_REDIRECT_STATUS, ResponseContext, SsrResponse, redirect_location};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumString};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Platform, RouterConfig};
use crate::error::CoreError;
use crate::link::Link;
use crate::model::Data;
use crate::source::Source;

/// Redirections followed for one navigation before giving up.
pub const MAX_REDIRECTIONS: usize = 10;

/// Observable router status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RouterState {
    /// Nothing requested yet, or auto-fetch is off.
    Idle,
    Fetching,
    Ready,
    Error,
}

impl RouterState {
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

/// How a navigation touches the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Method {
    Push,
    Replace,
    /// Restoring an entry: the history already moved.
    Pop,
}

/// Options of [`Router::set`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetOptions {
    /// `None` pushes on the client and leaves the history alone on the server.
    pub method: Option<Method>,
    /// Saved with the history entry.
    pub state: Value,
}

impl SetOptions {
    pub fn push() -> Self {
        Self {
            method: Some(Method::Push),
            state: Value::Null,
        }
    }

    pub fn replace() -> Self {
        Self {
            method: Some(Method::Replace),
            state: Value::Null,
        }
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }
}

/// The committed navigation.
#[derive(Debug, Clone)]
struct Committed {
    link: String,
    state: Value,
    /// Where the current redirection chain started.
    origin: String,
    /// Redirections followed since `origin`.
    hops: usize,
}

struct RouterInner {
    config: RouterConfig,
    source: Option<Source>,
    history: Arc<dyn History>,
    current: ArcSwap<Committed>,
    status: watch::Sender<RouterState>,
    /// Set once the client-side data watcher runs.
    watching: AtomicBool,
    cancel: CancellationToken,
}

/// Handle to the router. Cheap to clone.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("link", &self.link())
            .field("status", &self.status())
            .field("platform", &self.inner.config.platform)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// A router with an in-memory history.
    pub fn new(config: RouterConfig, source: Option<Source>) -> Self {
        Self::with_history(config, source, Arc::new(MemoryHistory::new()))
    }

    pub fn with_history(
        config: RouterConfig,
        source: Option<Source>,
        history: Arc<dyn History>,
    ) -> Self {
        let link = normalize(source.as_ref(), &config.initial_link);
        let (status, _) = watch::channel(RouterState::Idle);
        Self {
            inner: Arc::new(RouterInner {
                current: ArcSwap::from_pointee(Committed {
                    origin: link.clone(),
                    link,
                    state: Value::Null,
                    hops: 0,
                }),
                config,
                source,
                history,
                status,
                watching: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The committed link.
    pub fn link(&self) -> String {
        self.inner.current.load().link.clone()
    }

    /// The state saved with the committed link.
    pub fn state(&self) -> Value {
        self.inner.current.load().state.clone()
    }

    pub fn status(&self) -> RouterState {
        *self.inner.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RouterState> {
        self.inner.status.subscribe()
    }

    /// Wait until the committed link is ready or failed.
    pub async fn settled(&self) -> RouterState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| s.is_settled()).await {
            Ok(state) => *state,
            Err(_) => self.status(),
        }
    }

    pub fn source(&self) -> Option<&Source> {
        self.inner.source.as_ref()
    }

    pub fn history(&self) -> &Arc<dyn History> {
        &self.inner.history
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Descriptor of the committed link.
    pub fn data(&self) -> Option<Arc<Data>> {
        self.inner.source.as_ref().map(|s| s.get(&self.link()))
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Server: commit the normalized initial link and take the state from
    /// its data. Client: adopt the current history entry (if any), rewrite
    /// it with the committed state and start watching data changes for
    /// redirections.
    pub fn init(&self) {
        match self.inner.config.platform {
            Platform::Server => {
                let link = normalize(self.source(), &self.inner.config.initial_link);
                info!(link = %link, "router initialized (server)");
                self.commit(Committed {
                    origin: link.clone(),
                    link: link.clone(),
                    state: Value::Null,
                    hops: 0,
                });
                self.refresh_status(&link);
            }
            Platform::Client => {
                if let Some(entry) = self.inner.history.current() {
                    let link = normalize(self.source(), &entry.link);
                    self.commit(Committed {
                        origin: link.clone(),
                        link,
                        state: entry.state,
                        hops: 0,
                    });
                }
                let current = self.inner.current.load_full();
                self.inner
                    .history
                    .replace(HistoryEntry::new(current.link.clone(), current.state.clone()));
                info!(link = %current.link, "router initialized (client)");
                self.spawn_watcher();
                self.refresh_status(&current.link);
            }
        }
    }

    /// Stop background tasks.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Navigate to `link`.
    pub fn set(&self, link: &str, options: SetOptions) {
        let key = normalize(self.source(), link);
        self.navigate(key.clone(), key, 0, options);
    }

    /// Restore a history entry.
    pub fn pop(&self, link: &str, state: Value) {
        self.set(
            link,
            SetOptions {
                method: Some(Method::Pop),
                state,
            },
        );
    }

    /// Go one entry back. Returns `false` at the start of the history.
    pub fn back(&self) -> bool {
        match self.inner.history.back() {
            Some(entry) => {
                self.pop(&entry.link, entry.state);
                true
            }
            None => false,
        }
    }

    /// Go one entry forward. Returns `false` at the end of the history.
    pub fn forward(&self) -> bool {
        match self.inner.history.forward() {
            Some(entry) => {
                self.pop(&entry.link, entry.state);
                true
            }
            None => false,
        }
    }

    fn navigate(&self, key: String, origin: String, hops: usize, options: SetOptions) {
        let (link, hops) = match self.chase(&key, hops) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(link = %origin, error = %err, "redirection loop");
                if let Some(source) = self.source() {
                    let (status, text) = err.status();
                    source.fail(&origin, status, &text);
                }
                (origin.clone(), 0)
            }
        };

        let is_client = self.inner.config.platform == Platform::Client;
        let method = options
            .method
            .or_else(|| is_client.then_some(Method::Push));

        if is_client {
            let entry = HistoryEntry::new(link.clone(), options.state.clone());
            match method {
                Some(Method::Push) => self.inner.history.push(entry),
                Some(Method::Replace) => self.inner.history.replace(entry),
                Some(Method::Pop) | None => {}
            }
        }

        self.commit(Committed {
            link: link.clone(),
            state: options.state,
            origin,
            hops,
        });
        info!(link = %link, method = ?method, "router link committed");

        let settled = self.refresh_status(&link);
        let fetch = self.inner.config.auto_fetch && (is_client || method.is_some());
        if fetch && !settled {
            self.spawn_fetch(link);
        }
    }

    /// Follow the redirections already known for `key`.
    fn chase(&self, key: &str, hops: usize) -> Result<(String, usize), CoreError> {
        let too_many = |hops| CoreError::RedirectLoop {
            link: key.to_owned(),
            hops,
        };
        if hops > MAX_REDIRECTIONS {
            return Err(too_many(hops));
        }
        let Some(source) = self.source() else {
            return Ok((key.to_owned(), hops));
        };

        let mut hops = hops;
        let mut current = key.to_owned();
        let mut visited = vec![current.clone()];

        loop {
            let data = source.get(&current);
            let Some(redirection) = data.as_redirection() else {
                break;
            };
            if redirection.is_external {
                break;
            }

            let next = redirection.location.clone();
            hops += 1;
            if hops > MAX_REDIRECTIONS || visited.contains(&next) {
                return Err(too_many(hops));
            }
            debug!(from = %current, to = %next, "following redirection");
            source.mark_redirection_resolved(&current);
            visited.push(next.clone());
            current = next;
        }

        Ok((current, hops))
    }

    fn commit(&self, committed: Committed) {
        self.inner.current.store(Arc::new(committed));
    }

    /// Derive the status from the descriptor of `link`. Returns `true`
    /// when the descriptor is settled.
    fn refresh_status(&self, link: &str) -> bool {
        let Some(source) = self.source() else {
            self.inner.status.send_replace(RouterState::Idle);
            return false;
        };
        let data = source.get(link);
        let state = if data.is_error() {
            RouterState::Error
        } else if data.is_ready || data.is_redirection() {
            RouterState::Ready
        } else if data.is_fetching {
            RouterState::Fetching
        } else {
            RouterState::Idle
        };
        self.inner.status.send_replace(state);
        state.is_settled()
    }

    // ── Background work ──────────────────────────────────────────────

    fn spawn_fetch(&self, link: String) {
        let Some(source) = self.inner.source.clone() else {
            warn!("auto_fetch is enabled but no source is attached");
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!(link = %link, "no async runtime; fetch not started");
            return;
        };

        self.inner.status.send_replace(RouterState::Fetching);
        let router = self.clone();
        handle.spawn(async move {
            source.fetch(&link).await;
            router.on_fetched(&link);
        });
    }

    /// Apply a finished fetch, unless the link changed meanwhile.
    fn on_fetched(&self, link: &str) {
        let current = self.inner.current.load_full();
        if current.link != link {
            debug!(link, current = %current.link, "discarding stale fetch result");
            return;
        }

        if let Some(data) = self.data() {
            let follow = data
                .as_redirection()
                .filter(|r| !r.is_external)
                .map(|r| r.location.clone());
            if let Some(location) = follow {
                if self.inner.config.platform == Platform::Client {
                    // The data watcher follows it when running.
                    if !self.inner.watching.load(Ordering::Acquire) {
                        self.follow(&current, &location);
                    }
                    return;
                }
            }
        }

        self.refresh_status(link);
    }

    /// Replace the committed link with a redirection target.
    fn follow(&self, current: &Committed, location: &str) {
        if let Some(source) = self.source() {
            source.mark_redirection_resolved(&current.link);
        }
        let key = normalize(self.source(), location);
        self.navigate(
            key,
            current.origin.clone(),
            current.hops + 1,
            SetOptions {
                method: Some(Method::Replace),
                state: current.state.clone(),
            },
        );
    }

    fn spawn_watcher(&self) {
        let Some(source) = self.inner.source.clone() else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!("no async runtime; redirections will not be watched");
            return;
        };
        if self.inner.watching.swap(true, Ordering::AcqRel) {
            return;
        }

        let weak: Weak<RouterInner> = Arc::downgrade(&self.inner);
        let cancel = self.inner.cancel.clone();
        let mut changes = BroadcastStream::new(source.subscribe());

        handle.spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    change = changes.next() => {
                        let Some(change) = change else { break };
                        let Some(inner) = weak.upgrade() else { break };
                        let router = Router { inner };
                        match change {
                            Ok(change) => router.on_data_change(&change.key),
                            Err(err) => {
                                warn!(error = %err, "data watcher lagged, re-checking current link");
                                router.on_data_change(&router.link());
                            }
                        }
                    }
                }
            }
            debug!("data watcher stopped");
        });
    }

    /// Re-chase redirections when the descriptor of the current link changes.
    fn on_data_change(&self, key: &str) {
        let current = self.inner.current.load_full();
        if current.link != key {
            return;
        }
        let Some(data) = self.data() else { return };
        match data.as_redirection() {
            Some(r) if !r.is_external => {
                let location = r.location.clone();
                self.follow(&current, &location);
            }
            _ => {
                self.refresh_status(key);
            }
        }
    }

    // ── Server rendering ─────────────────────────────────────────────

    /// Fetch the committed link and translate its descriptor into the
    /// response: a redirect for redirections, the status for errors.
    pub async fn before_ssr(&self, ctx: &mut dyn ResponseContext) {
        if !self.inner.config.auto_fetch {
            return;
        }
        let Some(source) = self.source() else {
            warn!("auto_fetch is enabled but no source is attached");
            return;
        };

        let link = self.link();
        source.fetch(&link).await;
        let data = source.get(&link);

        if let Some(redirection) = data.as_redirection() {
            let location = redirect_location(&data, &redirection.location, &self.inner.config.options);
            let status = redirection
                .redirect_status
                .unwrap_or(DEFAULT_REDIRECT_STATUS);
            info!(link = %link, location = %location, status, "SSR redirect");
            ctx.redirect(&location, status);
        } else if let Some(error) = data.as_error() {
            info!(link = %link, status = error.error_status, "SSR error status");
            ctx.set_status(error.error_status);
        }

        self.refresh_status(&link);
    }
}

impl Drop for RouterInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Canonical key, or the raw link when it cannot be parsed (the fetch
/// then stores a 404 under it).
fn normalize(source: Option<&Source>, link: &str) -> String {
    let parsed = match source {
        Some(source) => source.normalize(link),
        None => Link::parse(link).map(|l| l.key()),
    };
    parsed.unwrap_or_else(|err| {
        warn!(link, error = %err, "malformed link");
        link.to_owned()
    })
}
