//! The external-facing [`Ctrie`] handle.

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::cursor::Cursor;
use crate::error::CoreError;
use crate::gcas::GcasContext;
use crate::generation::Generation;
use crate::node::{CNode, INode, MainNodeContent, Singleton};
use crate::ops::insert::insert_rec;
use crate::ops::lookup::lookup_rec;
use crate::ops::remove::remove_rec;
use crate::rdcss::{rdcss_read_root, rdcss_root_rebuild, root_generation_via_rdcss, RootContext, RootSlot};
use crate::result::{Insert, Lookup, Remove, Signal};

/// A lock-free, ordered-by-hash-chunk concurrent trie with O(1)
/// lock-free snapshotting.
///
/// Every mutating method can be called from any number of threads
/// concurrently against the same `Ctrie`; readers never block writers and
/// writers never block each other beyond the bounded retry loops the GCAS
/// and RDCSS protocols use to resolve races. A snapshot obtained through
/// [`Ctrie::snapshot`] is itself a fully independent `Ctrie` handle that
/// shares structure with its parent until either side writes to it.
pub struct Ctrie<K, V, S = RandomState> {
    root: ArcSwap<RootSlot<K, V>>,
    read_only: bool,
    size: AtomicUsize,
    hash_builder: S,
}

impl<K, V> Ctrie<K, V, RandomState> {
    /// Creates an empty, writable trie using the default hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V> Default for Ctrie<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> GcasContext<K, V> for Ctrie<K, V, S> {
    fn read_only(&self) -> bool {
        self.read_only
    }

    fn root_generation_for_commit(&self) -> Generation {
        root_generation_via_rdcss(self)
    }
}

impl<K, V, S> RootContext<K, V> for Ctrie<K, V, S> {
    fn root_slot(&self) -> &ArcSwap<RootSlot<K, V>> {
        &self.root
    }
}

impl<K, V, S: BuildHasher> Ctrie<K, V, S> {
    /// Creates an empty, writable trie using a caller-supplied hasher.
    pub fn with_hasher(hash_builder: S) -> Self {
        let generation = Generation::new();
        let root = INode::new(MainNodeContent::CNode(CNode::empty(generation.clone())), generation);
        Self {
            root: ArcSwap::new(Arc::new(RootSlot::Root(root))),
            read_only: false,
            size: AtomicUsize::new(0),
            hash_builder,
        }
    }

    fn hash_of(&self, key: &K) -> u32
    where
        K: Hash,
    {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        let h64 = hasher.finish();
        ((h64 >> 32) as u32) ^ (h64 as u32)
    }

    /// Looks up `key`. Never fails, even on a read-only snapshot.
    pub fn lookup(&self, key: &K) -> Lookup<K, V>
    where
        K: Hash + Eq,
    {
        let hash = self.hash_of(key);
        loop {
            let root = rdcss_read_root(self, false);
            let start_generation = root.generation.clone();
            match lookup_rec(&root, None, &start_generation, hash, key, 0, self.read_only, self) {
                Signal::Done(outcome) => return outcome,
                Signal::Restart => continue,
            }
        }
    }

    /// Convenience wrapper over [`Ctrie::lookup`] returning a plain
    /// `Option`.
    pub fn get(&self, key: &K) -> Option<crate::result::Entry<K, V>>
    where
        K: Hash + Eq,
    {
        self.lookup(key).into_option()
    }

    /// Returns whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool
    where
        K: Hash + Eq,
    {
        matches!(self.lookup(key), Lookup::Present(_))
    }

    /// Inserts `key` → `value`.
    ///
    /// When `only_if_absent` is set, an existing entry is left untouched
    /// and returned as [`Insert::Replaced`] rather than overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadOnly`] if this handle was obtained as a
    /// read-only snapshot.
    pub fn insert(&self, key: K, value: V, only_if_absent: bool) -> Result<Insert<K, V>, CoreError>
    where
        K: Hash + Eq,
    {
        if self.read_only {
            return Err(CoreError::ReadOnly);
        }
        let hash = self.hash_of(&key);
        let entry = Arc::new(Singleton { hash, key, value });
        loop {
            let root = rdcss_read_root(self, false);
            let start_generation = root.generation.clone();
            match insert_rec(&root, None, &start_generation, Arc::clone(&entry), 0, only_if_absent, self) {
                Signal::Done(outcome) => {
                    if matches!(outcome, Insert::Inserted) {
                        self.size.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(outcome);
                }
                Signal::Restart => continue,
            }
        }
    }

    /// Removes `key`, optionally requiring its current value to equal
    /// `witness` for the removal to take effect.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadOnly`] if this handle was obtained as a
    /// read-only snapshot.
    pub fn remove(&self, key: &K, witness: Option<&V>) -> Result<Remove<K, V>, CoreError>
    where
        K: Hash + Eq,
        V: PartialEq,
    {
        if self.read_only {
            return Err(CoreError::ReadOnly);
        }
        let hash = self.hash_of(key);
        loop {
            let root = rdcss_read_root(self, false);
            let start_generation = root.generation.clone();
            match remove_rec(&root, None, &start_generation, hash, key, witness, 0, self) {
                Signal::Done(outcome) => {
                    if matches!(outcome, Remove::Removed(_)) {
                        self.size.fetch_sub(1, Ordering::Relaxed);
                    }
                    return Ok(outcome);
                }
                Signal::Restart => continue,
            }
        }
    }

    /// Takes an O(1), lock-free snapshot of the trie's current contents.
    ///
    /// The returned handle shares structure with `self` until one side
    /// writes to a branch the other still references, at which point that
    /// branch is lazily copied. Pass `read_only = true` to get a handle
    /// that can be traversed with [`Ctrie::traverse`] but never mutated;
    /// pass `false` to get an independent, fully writable fork.
    ///
    /// Two fresh generations are minted: one for `self`'s new root (so its
    /// own future writes renew away from whatever this handle now shares
    /// with the snapshot) and a distinct one for the returned handle's root.
    /// Both root I-nodes start out pointing at the same main content, so the
    /// only thing this call does eagerly is the O(1) root swap — no subtree
    /// is copied until a write actually needs to diverge from it.
    #[must_use]
    pub fn snapshot(&self, read_only: bool) -> Self
    where
        S: Clone,
    {
        let own_generation = Generation::new();
        let main = rdcss_root_rebuild(self, |observed| {
            INode::with_main(Arc::clone(observed), own_generation.clone())
        });
        let snapshot_generation = Generation::new();
        let snapshot_root = INode::with_main(main, snapshot_generation);
        Self {
            root: ArcSwap::new(Arc::new(RootSlot::Root(snapshot_root))),
            read_only,
            size: AtomicUsize::new(self.size.load(Ordering::Relaxed)),
            hash_builder: self.hash_builder.clone(),
        }
    }

    /// Returns a depth-first cursor over this handle's entries.
    ///
    /// # Panics
    ///
    /// Panics if this handle is not a read-only snapshot — traversal order
    /// is only meaningful against a frozen tree.
    #[must_use]
    pub fn traverse(&self) -> Cursor<'_, K, V, S> {
        assert!(
            self.read_only,
            "traverse() requires a read-only snapshot; call snapshot(true) first"
        );
        let root = rdcss_read_root(self, false);
        Cursor::new(self, root)
    }

    /// Returns the number of entries, tracked as an O(1) atomic counter
    /// rather than computed by walking the trie.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Returns `true` if the trie holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns whether this handle is a read-only snapshot.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl<K, V, S> fmt::Debug for Ctrie<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctrie")
            .field("size", &self.size.load(Ordering::Relaxed))
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}
