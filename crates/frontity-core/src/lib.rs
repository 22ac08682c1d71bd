//! Data layer between `frontity-api` and a rendering app (or the CLI).
//!
//! - **[`Link`]** / [`LinkNormalizer`]: one canonical key per link, however
//!   it was spelled (absolute URL, missing slash, `/page/N/`, query order).
//!
//! - **[`Source`]**: resolves a link against the WordPress REST API,
//!   merges the entities it returns into the [`Store`] and writes a
//!   [`Data`] descriptor. Concurrent fetches of one link share a request;
//!   failures become error descriptors instead of escaping.
//!
//! - **[`Store`]**: the normalized state. A link -> descriptor index and a
//!   `(type, id)` -> entity store, both `DashMap` collections with `watch`
//!   version counters. Snapshots hydrate a client from server state.
//!
//! - **[`Router`]**: owns the current link. `set` commits immediately and
//!   fetches in the background; stale results are dropped and known
//!   redirections are followed. [`Router::before_ssr`] turns the descriptor
//!   into an HTTP status or redirect.

pub mod config;
pub mod error;
pub mod link;
pub mod model;
pub mod router;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    Platform, PostTypeConfig, RedirectRule, RedirectionMode, RouterConfig, SourceConfig,
    TaxonomyConfig, TlsVerification,
};
pub use error::CoreError;
pub use link::{Link, LinkError, LinkNormalizer};
pub use router::{
    History, HistoryEntry, MAX_REDIRECTIONS, MemoryHistory, Method, ResponseContext, Router,
    RouterState, SetOptions, SsrResponse,
};
pub use source::{FetchOptions, RedirectionRules, Source};
pub use store::{DataChange, Store, StoreSnapshot};

pub use model::{
    ArchiveData, ArchiveKind, Data, DataKind, Entity, EntityKey, ErrorData, ItemRef, PostKind,
    PostTypeData, RedirectionData,
};
