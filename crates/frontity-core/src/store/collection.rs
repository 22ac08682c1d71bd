// ── Generic keyed collection ──
//
// Lock-free concurrent storage with O(1) lookups and a `watch` version
// counter bumped on every mutation.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

/// A lock-free collection of `Arc`-shared values.
///
/// Readers get the stored `Arc` back, so two lookups of the same key
/// between writes return the same allocation.
pub(crate) struct Collection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,
}

impl<K, T> Collection<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            by_key: DashMap::new(),
            version,
        }
    }

    /// Insert or replace a value. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: K, value: T) -> bool {
        let is_new = self.by_key.insert(key, Arc::new(value)).is_none();
        self.bump_version();
        is_new
    }

    /// Store an already shared value, replacing any previous one.
    pub(crate) fn insert_arc(&self, key: K, value: Arc<T>) {
        self.by_key.insert(key, value);
        self.bump_version();
    }

    /// Compute the new value under `key` from the current one (if any).
    /// The map shard stays locked for the duration, so concurrent updates
    /// of one key cannot lose writes.
    pub(crate) fn upsert_with(&self, key: K, f: impl FnOnce(Option<&T>) -> T) -> Arc<T> {
        let updated = match self.by_key.entry(key) {
            Entry::Occupied(mut entry) => {
                let updated = Arc::new(f(Some(entry.get())));
                entry.insert(Arc::clone(&updated));
                updated
            }
            Entry::Vacant(entry) => {
                let updated = Arc::new(f(None));
                entry.insert(Arc::clone(&updated));
                updated
            }
        };
        self.bump_version();
        updated
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// All values matching `pred`.
    pub(crate) fn filter(&self, pred: impl Fn(&K, &T) -> bool) -> Vec<Arc<T>> {
        self.by_key
            .iter()
            .filter(|r| pred(r.key(), r.value()))
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    /// Current values (cheap `Arc` clones).
    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.by_key.iter().map(|r| Arc::clone(r.value())).collect()
    }

    pub(crate) fn keys(&self) -> Vec<K> {
        self.by_key.iter().map(|r| r.key().clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub(crate) fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn bump_version(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_returns_true_for_new_key() {
        let col: Collection<String, String> = Collection::new();
        assert!(col.upsert("key1".into(), "hello".into()));
        assert!(!col.upsert("key1".into(), "world".into()));
        assert_eq!(*col.get(&"key1".to_owned()).unwrap(), "world");
    }

    #[test]
    fn repeated_reads_share_the_allocation() {
        let col: Collection<String, String> = Collection::new();
        col.upsert("a".into(), "x".into());
        let first = col.get(&"a".to_owned()).unwrap();
        let second = col.get(&"a".to_owned()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn upsert_with_merges_under_lock() {
        let col: Collection<u64, Vec<u32>> = Collection::new();
        col.upsert_with(1, |v| {
            let mut v = v.cloned().unwrap_or_default();
            v.push(1);
            v
        });
        let merged = col.upsert_with(1, |v| {
            let mut v = v.cloned().unwrap_or_default();
            v.push(2);
            v
        });
        assert_eq!(*merged, vec![1, 2]);
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn every_mutation_bumps_version() {
        let col: Collection<String, u32> = Collection::new();
        let rx = col.subscribe_version();
        assert_eq!(*rx.borrow(), 0);

        col.upsert("a".into(), 1);
        col.upsert("a".into(), 2);
        col.upsert_with("b".into(), |v| v.copied().unwrap_or(0) + 1);
        assert_eq!(*rx.borrow(), 3);
        assert_eq!(col.version(), 3);
    }

    #[test]
    fn filter_and_snapshot() {
        let col: Collection<String, u32> = Collection::new();
        assert!(col.is_empty());
        col.upsert("a".into(), 1);
        col.upsert("b".into(), 2);
        col.upsert("c".into(), 3);

        assert_eq!(col.snapshot().len(), 3);
        let mut odd: Vec<u32> = col.filter(|_, v| v % 2 == 1).iter().map(|v| **v).collect();
        odd.sort_unstable();
        assert_eq!(odd, vec![1, 3]);
        assert!(col.contains(&"b".to_owned()));
        assert_eq!(col.keys().len(), 3);
    }
}
