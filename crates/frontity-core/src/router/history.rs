// ── Navigation history ──
//
// The router's view of the browser history: entries are a link plus a
// JSON state payload round-tripped through push/replace/pop.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub link: String,
    #[serde(default)]
    pub state: Value,
}

impl HistoryEntry {
    pub fn new(link: impl Into<String>, state: Value) -> Self {
        Self {
            link: link.into(),
            state,
        }
    }
}

/// A navigation history (the browser's, or an in-memory one).
pub trait History: Send + Sync {
    /// Add an entry after the current one, dropping any forward entries.
    fn push(&self, entry: HistoryEntry);
    /// Overwrite the current entry.
    fn replace(&self, entry: HistoryEntry);
    /// Step back. Returns the entry that is now current.
    fn back(&self) -> Option<HistoryEntry>;
    /// Step forward. Returns the entry that is now current.
    fn forward(&self) -> Option<HistoryEntry>;
    fn current(&self) -> Option<HistoryEntry>;
}

#[derive(Debug, Default)]
struct Stack {
    entries: Vec<HistoryEntry>,
    index: usize,
}

/// In-memory history, for the server and for tests.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    stack: Mutex<Stack>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history whose only entry is `link`.
    pub fn starting_at(link: impl Into<String>) -> Self {
        Self {
            stack: Mutex::new(Stack {
                entries: vec![HistoryEntry::new(link, Value::Null)],
                index: 0,
            }),
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Stack> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl History for MemoryHistory {
    fn push(&self, entry: HistoryEntry) {
        let mut stack = self.lock();
        if !stack.entries.is_empty() {
            let keep = stack.index + 1;
            stack.entries.truncate(keep);
        }
        stack.entries.push(entry);
        stack.index = stack.entries.len() - 1;
    }

    fn replace(&self, entry: HistoryEntry) {
        let mut stack = self.lock();
        let index = stack.index;
        match stack.entries.get_mut(index) {
            Some(current) => *current = entry,
            None => stack.entries.push(entry),
        }
    }

    fn back(&self) -> Option<HistoryEntry> {
        let mut stack = self.lock();
        if stack.index == 0 {
            return None;
        }
        stack.index -= 1;
        stack.entries.get(stack.index).cloned()
    }

    fn forward(&self) -> Option<HistoryEntry> {
        let mut stack = self.lock();
        if stack.index + 1 >= stack.entries.len() {
            return None;
        }
        stack.index += 1;
        stack.entries.get(stack.index).cloned()
    }

    fn current(&self) -> Option<HistoryEntry> {
        let stack = self.lock();
        stack.entries.get(stack.index).cloned()
    }
}
