//! Outcome types returned across the external boundary.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::node::Singleton;

/// A reference-counted handle to one key-value pair stored in the trie.
///
/// Holding an `Entry` keeps that pair's backing allocation alive even after
/// it has been unlinked from the trie by a concurrent remove — readers never
/// observe a dangling entry, and no generic `Clone` bound on `V` is needed
/// to hand one back to the caller.
pub struct Entry<K, V> {
    inner: Arc<Singleton<K, V>>,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn from_singleton(inner: Arc<Singleton<K, V>>) -> Self {
        Self { inner }
    }

    /// Returns the entry's key.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.inner.key
    }

    /// Returns the entry's value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.inner.value
    }
}

impl<K, V> Deref for Entry<K, V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.inner.value
    }
}

impl<K, V> Clone for Entry<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for Entry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.key == other.inner.key && self.inner.value == other.inner.value
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.inner.key)
            .field("value", &self.inner.value)
            .finish()
    }
}

/// Outcome of [`Ctrie::lookup`](crate::Ctrie::lookup).
#[derive(Debug, Clone)]
pub enum Lookup<K, V> {
    /// The key was found.
    Present(Entry<K, V>),
    /// No entry for the key exists.
    Absent,
}

impl<K, V> Lookup<K, V> {
    /// Converts to a plain `Option`, discarding the distinction between "not
    /// found" and any future variant.
    #[must_use]
    pub fn into_option(self) -> Option<Entry<K, V>> {
        match self {
            Self::Present(entry) => Some(entry),
            Self::Absent => None,
        }
    }
}

/// Outcome of [`Ctrie::insert`](crate::Ctrie::insert).
#[derive(Debug, Clone)]
pub enum Insert<K, V> {
    /// No prior entry existed for the key; it was added.
    Inserted,
    /// An entry already existed; it was replaced (or, under
    /// `only_if_absent`, preserved) and is returned here.
    Replaced(Entry<K, V>),
}

/// Outcome of [`Ctrie::remove`](crate::Ctrie::remove).
#[derive(Debug, Clone)]
pub enum Remove<K, V> {
    /// The entry was found (and, if a witness value was supplied, matched
    /// it) and has been unlinked.
    Removed(Entry<K, V>),
    /// No matching entry was present.
    Absent,
}

/// Internal control-flow signal threaded through the recursive operations.
///
/// `Restart` never escapes the crate: every public entry point loops on it
/// until a `Done` is produced.
pub(crate) enum Signal<T> {
    Done(T),
    Restart,
}
