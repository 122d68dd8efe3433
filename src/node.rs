//! Node types and bitmap addressing.
//!
//! The trie is addressed five bits at a time out of a 32-bit hash, giving a
//! branching factor of 32 per level and a maximum useful depth of
//! `ceil(32 / 5) = 7` levels before the hash is exhausted and colliding keys
//! fall back to a [`CollisionNode`] leaf.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::generation::Generation;

/// Bits consumed per trie level.
pub(crate) const BITS_PER_LEVEL: u32 = 5;
/// Bitmask selecting one fragment's worth of bits.
const LEVEL_MASK: u32 = (1 << BITS_PER_LEVEL) - 1;
/// Last level at which the 32-bit hash still has unconsumed bits.
pub(crate) const MAX_LEVEL: u32 = 30;

/// Extracts the 5-bit address fragment for `level` out of `hash`.
#[inline]
pub(crate) const fn fragment(hash: u32, level: u32) -> u32 {
    (hash >> level) & LEVEL_MASK
}

/// Converts an address fragment into its one-hot occupancy bit.
#[inline]
pub(crate) const fn flag(fragment: u32) -> u32 {
    1 << fragment
}

/// Dense-array offset of the slot tagged by `bit` within `bitmap`.
#[inline]
pub(crate) const fn position(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

/// A single key-value pair, the leaf unit of the trie.
pub(crate) struct Singleton<K, V> {
    pub(crate) hash: u32,
    pub(crate) key: K,
    pub(crate) value: V,
}

/// Multiple entries that hash identically through every level, kept as a
/// flat list once the address space is exhausted.
pub(crate) struct CollisionNode<K, V> {
    pub(crate) hash: u32,
    pub(crate) entries: Vec<Arc<Singleton<K, V>>>,
}

impl<K: Eq, V> CollisionNode<K, V> {
    pub(crate) fn find(&self, key: &K) -> Option<&Arc<Singleton<K, V>>> {
        self.entries.iter().find(|entry| &entry.key == key)
    }

    /// Inserts or replaces `entry` by key, returning the new leaf content.
    pub(crate) fn with_upserted(&self, entry: Arc<Singleton<K, V>>) -> MainNodeContent<K, V> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|existing| existing.key != entry.key)
            .cloned()
            .collect();
        entries.push(entry);
        MainNodeContent::Collision(CollisionNode {
            hash: self.hash,
            entries,
        })
    }

    /// Removes `key`, contracting down to a [`MainNodeContent::Tomb`] when a
    /// single entry remains.
    pub(crate) fn without(&self, key: &K) -> MainNodeContent<K, V> {
        let entries: Vec<_> = self
            .entries
            .iter()
            .filter(|existing| &existing.key != key)
            .cloned()
            .collect();
        if let [only] = entries.as_slice() {
            MainNodeContent::Tomb(Arc::clone(only))
        } else {
            MainNodeContent::Collision(CollisionNode {
                hash: self.hash,
                entries,
            })
        }
    }
}

/// One child slot of a [`CNode`]: either a leaf pair or a deeper I-node.
pub(crate) enum Branch<K, V> {
    Singleton(Arc<Singleton<K, V>>),
    Node(Arc<INode<K, V>>),
}

impl<K, V> Clone for Branch<K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Singleton(singleton) => Self::Singleton(Arc::clone(singleton)),
            Self::Node(inode) => Self::Node(Arc::clone(inode)),
        }
    }
}

/// A branch node: a 32-way bitmap-compressed array of children.
pub(crate) struct CNode<K, V> {
    pub(crate) bitmap: u32,
    pub(crate) array: Box<[Branch<K, V>]>,
    pub(crate) generation: Generation,
}

impl<K, V> CNode<K, V> {
    pub(crate) fn empty(generation: Generation) -> Self {
        Self {
            bitmap: 0,
            array: Box::new([]),
            generation,
        }
    }

    /// Returns a copy with `branch` inserted at the slot for `bit`.
    ///
    /// `bit` must not already be set in `self.bitmap`.
    pub(crate) fn with_inserted(&self, bit: u32, branch: Branch<K, V>, generation: Generation) -> Self {
        let new_bitmap = self.bitmap | bit;
        let at = position(new_bitmap, bit);
        let mut array = Vec::with_capacity(self.array.len() + 1);
        array.extend(self.array[..at].iter().cloned());
        array.push(branch);
        array.extend(self.array[at..].iter().cloned());
        Self {
            bitmap: new_bitmap,
            array: array.into_boxed_slice(),
            generation,
        }
    }

    /// Returns a copy with the slot at `idx` replaced by `branch`.
    pub(crate) fn with_replaced(&self, idx: usize, branch: Branch<K, V>) -> Self {
        let mut array: Vec<Branch<K, V>> = self.array.iter().cloned().collect();
        array[idx] = branch;
        Self {
            bitmap: self.bitmap,
            array: array.into_boxed_slice(),
            generation: self.generation.clone(),
        }
    }

    /// Drops the slot at `idx`/`bit`, contracting to a [`MainNodeContent::Tomb`]
    /// when exactly one singleton child remains below the root level.
    pub(crate) fn without(&self, idx: usize, bit: u32, level: u32) -> MainNodeContent<K, V> {
        let new_bitmap = self.bitmap & !bit;
        let array: Vec<Branch<K, V>> = self
            .array
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, branch)| branch.clone())
            .collect();
        contract(new_bitmap, array, self.generation.clone(), level)
    }
}

/// Collapses a freshly rebuilt array down to a [`MainNodeContent::Tomb`]
/// when it holds exactly one singleton and the node is not the root.
pub(crate) fn contract<K, V>(
    bitmap: u32,
    array: Vec<Branch<K, V>>,
    generation: Generation,
    level: u32,
) -> MainNodeContent<K, V> {
    if level > 0 {
        if let [Branch::Singleton(only)] = array.as_slice() {
            return MainNodeContent::Tomb(Arc::clone(only));
        }
    }
    MainNodeContent::CNode(CNode {
        bitmap,
        array: array.into_boxed_slice(),
        generation,
    })
}

/// The payload an I-node's main pointer currently holds.
pub(crate) enum MainNodeContent<K, V> {
    CNode(CNode<K, V>),
    /// A tombstone: the lone survivor of a contracted branch, resurrected
    /// into its parent the next time cleanup visits it.
    Tomb(Arc<Singleton<K, V>>),
    Collision(CollisionNode<K, V>),
}

/// Tracks whether a main node's replacement of its predecessor has been
/// confirmed, is still in flight, or was rolled back.
///
/// This is the GCAS "previous" field from the design: a main node starts
/// `Pending` on its predecessor and is driven to `Committed` (or rolled
/// back to `Failed`) by whichever thread next reads through it.
pub(crate) enum PrevSlot<K, V> {
    Committed,
    Pending(Arc<MainNode<K, V>>),
    Failed(Arc<MainNode<K, V>>),
}

/// One generation-stamped snapshot of an I-node's content, plus the GCAS
/// bookkeeping needed to tell whether it has actually taken effect.
pub(crate) struct MainNode<K, V> {
    pub(crate) content: MainNodeContent<K, V>,
    pub(crate) prev: ArcSwap<PrevSlot<K, V>>,
}

impl<K, V> MainNode<K, V> {
    pub(crate) fn committed(content: MainNodeContent<K, V>) -> Arc<Self> {
        Arc::new(Self {
            content,
            prev: ArcSwap::new(Arc::new(PrevSlot::Committed)),
        })
    }

    fn pending_on(content: MainNodeContent<K, V>, previous: Arc<MainNode<K, V>>) -> Arc<Self> {
        Arc::new(Self {
            content,
            prev: ArcSwap::new(Arc::new(PrevSlot::Pending(previous))),
        })
    }
}

/// An indirection node: the only mutable cell in the trie. Its `main`
/// pointer is swapped by the GCAS protocol; the node itself never moves
/// once installed in a parent [`CNode`].
pub(crate) struct INode<K, V> {
    pub(crate) main: ArcSwap<MainNode<K, V>>,
    pub(crate) generation: Generation,
}

impl<K, V> INode<K, V> {
    pub(crate) fn new(content: MainNodeContent<K, V>, generation: Generation) -> Arc<Self> {
        Arc::new(Self {
            main: ArcSwap::new(MainNode::committed(content)),
            generation,
        })
    }

    /// Wraps an already-committed main node (typically one just read back
    /// out of another I-node) under a new generation, without copying its
    /// content.
    pub(crate) fn with_main(main: Arc<MainNode<K, V>>, generation: Generation) -> Arc<Self> {
        Arc::new(Self {
            main: ArcSwap::new(main),
            generation,
        })
    }

    /// Builds the GCAS-pending replacement for `old` and attempts to swap
    /// it in. Returns `None` if the initial compare-and-swap lost a race;
    /// the caller treats that as an operation restart. Returns `Some` with
    /// the node that is the *committed* result of the attempt (which is
    /// `new` on success, or the rolled-back predecessor on failure) and a
    /// bool recording which of the two it was.
    pub(crate) fn begin_gcas(
        self: &Arc<Self>,
        old: &Arc<MainNode<K, V>>,
        new_content: MainNodeContent<K, V>,
    ) -> Option<Arc<MainNode<K, V>>> {
        let new_node = MainNode::pending_on(new_content, Arc::clone(old));
        let witness = self.main.compare_and_swap(old, Arc::clone(&new_node));
        if Arc::ptr_eq(&witness, old) {
            Some(new_node)
        } else {
            None
        }
    }
}
