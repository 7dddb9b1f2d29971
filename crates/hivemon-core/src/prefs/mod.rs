//! Namespaced key-value persistence abstraction.

mod memory;
pub mod table;

#[cfg(test)]
mod tests;

pub use memory::{MemoryStore, MemoryStoreError};

use heapless::String;
use log::warn;

/// Longest namespace or key accepted by stores (NVS limit).
pub const KEY_MAX: usize = 15;
/// Longest string value a store must be able to hold.
pub const STRING_VALUE_MAX: usize = 64;

/// One stored value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PrefValue {
    I32(i32),
    Bool(bool),
    Str(String<STRING_VALUE_MAX>),
}

/// Abstract preference persistence backend.
///
/// Writes may be buffered until [`PreferenceStore::commit`].
pub trait PreferenceStore {
    type Error: core::fmt::Debug;

    fn get(&mut self, namespace: &str, key: &str) -> Result<Option<PrefValue>, Self::Error>;
    fn put(&mut self, namespace: &str, key: &str, value: PrefValue) -> Result<(), Self::Error>;
    /// Returns `true` when a value was present.
    fn remove(&mut self, namespace: &str, key: &str) -> Result<bool, Self::Error>;
    fn commit(&mut self) -> Result<(), Self::Error>;
}

/// How a [`Namespace`] session was opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PrefsError<E> {
    /// Write attempted through a read-only session.
    ReadOnly,
    /// String does not fit [`STRING_VALUE_MAX`].
    ValueTooLong,
    Backend(E),
}

/// Open session on one namespace of a store.
///
/// Getters fall back to the supplied default when the key is absent, holds a
/// different type, or the backend fails. A read-write session commits on
/// [`Namespace::close`]; an unclosed dirty session commits when dropped.
pub struct Namespace<'a, S: PreferenceStore> {
    store: &'a mut S,
    name: &'a str,
    access: Access,
    dirty: bool,
}

impl<'a, S: PreferenceStore> Namespace<'a, S> {
    pub fn open(store: &'a mut S, name: &'a str, access: Access) -> Self {
        Self {
            store,
            name,
            access,
            dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn int_or(&mut self, key: &str, default: i32) -> i32 {
        match self.read(key) {
            Some(PrefValue::I32(value)) => value,
            _ => default,
        }
    }

    pub fn bool_or(&mut self, key: &str, default: bool) -> bool {
        match self.read(key) {
            Some(PrefValue::Bool(value)) => value,
            _ => default,
        }
    }

    /// Reads a string, falling back to `default` (truncated to `N`) when the
    /// stored value is missing or longer than `N`.
    pub fn string_or<const N: usize>(&mut self, key: &str, default: &str) -> String<N> {
        if let Some(PrefValue::Str(value)) = self.read(key) {
            let mut out = String::new();
            if out.push_str(&value).is_ok() {
                return out;
            }
            warn!(
                "prefs: {}/{} holds {} bytes, caller allows {}",
                self.name,
                key,
                value.len(),
                N
            );
        }

        let mut out = String::new();
        for ch in default.chars() {
            if out.push(ch).is_err() {
                break;
            }
        }
        out
    }

    pub fn contains(&mut self, key: &str) -> bool {
        self.read(key).is_some()
    }

    pub fn put_int(&mut self, key: &str, value: i32) -> Result<(), PrefsError<S::Error>> {
        self.write(key, PrefValue::I32(value))
    }

    pub fn put_bool(&mut self, key: &str, value: bool) -> Result<(), PrefsError<S::Error>> {
        self.write(key, PrefValue::Bool(value))
    }

    pub fn put_string(&mut self, key: &str, value: &str) -> Result<(), PrefsError<S::Error>> {
        let mut stored = String::new();
        stored
            .push_str(value)
            .map_err(|_| PrefsError::ValueTooLong)?;
        self.write(key, PrefValue::Str(stored))
    }

    pub fn remove(&mut self, key: &str) -> Result<bool, PrefsError<S::Error>> {
        self.ensure_writable()?;
        let removed = self
            .store
            .remove(self.name, key)
            .map_err(PrefsError::Backend)?;
        self.dirty |= removed;
        Ok(removed)
    }

    /// Ends the session, committing buffered writes.
    pub fn close(mut self) -> Result<(), PrefsError<S::Error>> {
        self.flush()
    }

    fn read(&mut self, key: &str) -> Option<PrefValue> {
        match self.store.get(self.name, key) {
            Ok(value) => value,
            Err(err) => {
                warn!("prefs: read {}/{} failed: {:?}", self.name, key, err);
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: PrefValue) -> Result<(), PrefsError<S::Error>> {
        self.ensure_writable()?;
        self.store
            .put(self.name, key, value)
            .map_err(PrefsError::Backend)?;
        self.dirty = true;
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), PrefsError<S::Error>> {
        match self.access {
            Access::ReadWrite => Ok(()),
            Access::ReadOnly => Err(PrefsError::ReadOnly),
        }
    }

    fn flush(&mut self) -> Result<(), PrefsError<S::Error>> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        self.store.commit().map_err(PrefsError::Backend)
    }
}

impl<S: PreferenceStore> Drop for Namespace<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!("prefs: commit of {} on drop failed: {:?}", self.name, err);
        }
    }
}
