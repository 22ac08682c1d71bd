// ── Entity store ──
//
// `(type, id)` -> normalized WordPress object. Append-only: entities are
// merged, never removed. Post-type and taxonomy metadata have no numeric
// id and live in a side collection keyed by slug.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use super::collection::Collection;
use crate::model::{Entity, EntityKey, POST_TYPE_TYPE, TAXONOMY_TYPE};

/// Key of a metadata object (`type` or `taxonomy`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MetaKey {
    kind: &'static str,
    slug: String,
}

pub struct EntityStore {
    entities: Collection<EntityKey, Entity>,
    metadata: Collection<MetaKey, Value>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            entities: Collection::new(),
            metadata: Collection::new(),
        }
    }

    pub fn get(&self, entity_type: &str, id: u64) -> Option<Arc<Entity>> {
        self.entities.get(&EntityKey::new(entity_type, id))
    }

    /// All entities of one type.
    pub fn of_type(&self, entity_type: &str) -> Vec<Arc<Entity>> {
        let mut found = self.entities.filter(|k, _| k.entity_type == entity_type);
        found.sort_by_key(|e| e.id);
        found
    }

    /// The entity of `entity_type` whose canonical link is `link`.
    pub fn find_by_link(&self, entity_type: &str, link: &str) -> Option<Arc<Entity>> {
        self.entities
            .filter(|k, e| k.entity_type == entity_type && e.link.as_deref() == Some(link))
            .into_iter()
            .next()
    }

    /// Post-type metadata (`/wp/v2/types/<slug>`).
    pub fn post_type(&self, slug: &str) -> Option<Arc<Value>> {
        self.metadata.get(&MetaKey {
            kind: POST_TYPE_TYPE,
            slug: slug.to_owned(),
        })
    }

    /// Taxonomy metadata (`/wp/v2/taxonomies/<slug>`).
    pub fn taxonomy(&self, slug: &str) -> Option<Arc<Value>> {
        self.metadata.get(&MetaKey {
            kind: TAXONOMY_TYPE,
            slug: slug.to_owned(),
        })
    }

    /// All entities, sorted by key.
    pub fn snapshot(&self) -> Vec<Arc<Entity>> {
        let mut all = self.entities.snapshot();
        all.sort_by_key(|e| e.key());
        all
    }

    /// All metadata objects as `(kind, slug, value)`.
    pub fn metadata_snapshot(&self) -> Vec<(String, String, Arc<Value>)> {
        let mut all: Vec<_> = self
            .metadata
            .keys()
            .into_iter()
            .filter_map(|k| {
                let value = self.metadata.get(&k)?;
                Some((k.kind.to_owned(), k.slug, value))
            })
            .collect();
        all.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        all
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // ── Write API (fetcher only) ─────────────────────────────────────

    /// Shallow-merge `entity` into the stored one (last write wins per
    /// field) or insert it.
    pub(crate) fn merge(&self, entity: Entity) -> Arc<Entity> {
        trace!(entity = %entity.key(), "merging entity");
        let key = entity.key();
        self.entities.upsert_with(key, move |current| match current {
            Some(current) => {
                let mut merged = current.clone();
                merged.merge(entity);
                merged
            }
            None => entity,
        })
    }

    /// Store metadata. Only `type` and `taxonomy` are kept.
    pub(crate) fn set_metadata(&self, kind: &str, slug: &str, value: Value) {
        let kind = match kind {
            POST_TYPE_TYPE => POST_TYPE_TYPE,
            TAXONOMY_TYPE => TAXONOMY_TYPE,
            _ => return,
        };
        self.metadata.upsert(
            MetaKey {
                kind,
                slug: slug.to_owned(),
            },
            value,
        );
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
