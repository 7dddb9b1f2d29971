use heapless::{String, Vec};

use super::{KEY_MAX, PrefValue, PreferenceStore};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MemoryStoreError {
    /// Namespace or key longer than [`KEY_MAX`].
    KeyTooLong,
    /// All entry slots are taken.
    Full,
}

#[derive(Clone, Debug)]
struct Entry {
    namespace: String<KEY_MAX>,
    key: String<KEY_MAX>,
    value: PrefValue,
}

/// Fixed-capacity RAM store.
///
/// Used by host tests and as the fallback backend when no flash partition is
/// available. Contents are lost on reset.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore<const N: usize> {
    entries: Vec<Entry, N>,
    commits: u32,
}

impl<const N: usize> MemoryStore<N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            commits: 0,
        }
    }

    /// Number of successful commits since creation.
    pub const fn commit_count(&self) -> u32 {
        self.commits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(namespace, key, value)` triples in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &PrefValue)> {
        self.entries
            .iter()
            .map(|entry| (entry.namespace.as_str(), entry.key.as_str(), &entry.value))
    }

    fn position(&self, namespace: &str, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.namespace.as_str() == namespace && entry.key.as_str() == key)
    }
}

impl<const N: usize> PreferenceStore for MemoryStore<N> {
    type Error = MemoryStoreError;

    fn get(&mut self, namespace: &str, key: &str) -> Result<Option<PrefValue>, Self::Error> {
        Ok(self
            .position(namespace, key)
            .and_then(|index| self.entries.get(index))
            .map(|entry| entry.value.clone()))
    }

    fn put(&mut self, namespace: &str, key: &str, value: PrefValue) -> Result<(), Self::Error> {
        if let Some(index) = self.position(namespace, key) {
            if let Some(entry) = self.entries.get_mut(index) {
                entry.value = value;
            }
            return Ok(());
        }

        let mut entry_namespace = String::new();
        entry_namespace
            .push_str(namespace)
            .map_err(|_| MemoryStoreError::KeyTooLong)?;
        let mut entry_key = String::new();
        entry_key
            .push_str(key)
            .map_err(|_| MemoryStoreError::KeyTooLong)?;

        self.entries
            .push(Entry {
                namespace: entry_namespace,
                key: entry_key,
                value,
            })
            .map_err(|_| MemoryStoreError::Full)
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<bool, Self::Error> {
        match self.position(namespace, key) {
            Some(index) => {
                self.entries.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.commits = self.commits.saturating_add(1);
        Ok(())
    }
}
