// ── Normalized store ──
//
// The data index (link -> descriptor) and the entity store ((type, id) ->
// entity), plus the serializable snapshot used to hydrate a client from
// server-rendered state.

mod collection;
mod data_index;
mod entity_store;

pub use data_index::{DataChange, DataIndex};
pub use entity_store::EntityStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::model::{Data, Entity};

/// A metadata object in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub kind: String,
    pub slug: String,
    pub value: Value,
}

/// Serializable copy of a [`Store`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub data: Vec<Data>,
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
}

/// Everything the source knows about the WordPress site.
pub struct Store {
    pub(crate) data: DataIndex,
    pub(crate) entities: EntityStore,
    pub(crate) last_fetch: watch::Sender<Option<DateTime<Utc>>>,
}

impl Store {
    pub fn new() -> Self {
        let (last_fetch, _) = watch::channel(None);
        Self {
            data: DataIndex::new(),
            entities: EntityStore::new(),
            last_fetch,
        }
    }

    /// Rebuild a store from a snapshot. Descriptors still marked as
    /// fetching are reset to the status-only flags so they can be fetched
    /// again.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::new();
        for entity in snapshot.entities {
            store.entities.merge(entity);
        }
        for meta in snapshot.metadata {
            store
                .entities
                .set_metadata(&meta.kind, &meta.slug, meta.value);
        }
        for mut data in snapshot.data {
            if data.is_fetching {
                data.is_fetching = false;
                data.is_ready = false;
            }
            store.data.insert(data);
        }
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            data: self.data.snapshot().iter().map(|d| (**d).clone()).collect(),
            entities: self
                .entities
                .snapshot()
                .iter()
                .map(|e| (**e).clone())
                .collect(),
            metadata: self
                .entities
                .metadata_snapshot()
                .into_iter()
                .map(|(kind, slug, value)| MetadataEntry {
                    kind,
                    slug,
                    value: (*value).clone(),
                })
                .collect(),
        }
    }

    pub fn data(&self) -> &DataIndex {
        &self.data
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Descriptor-write counter.
    pub fn version(&self) -> watch::Receiver<u64> {
        self.data.subscribe_version()
    }

    /// When the last fetch settled.
    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        *self.last_fetch.borrow()
    }

    pub(crate) fn touch(&self) {
        self.last_fetch.send_replace(Some(Utc::now()));
    }

    /// Resolve the entity references of a descriptor.
    pub fn resolve(&self, data: &Data) -> Vec<Arc<Entity>> {
        data.references()
            .into_iter()
            .filter_map(|(entity_type, id)| self.entities.get(entity_type, id))
            .collect()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
