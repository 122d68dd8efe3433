//! A lock-free concurrent hash trie.
//!
//! This is the GCAS/RDCSS design originally described by Prokopec et al.
//! for Scala's `TrieMap`: a hash-array-mapped trie of indirection nodes
//! (I-nodes), each guarded by a generation-aware compare-and-set so that an
//! in-flight write can be told apart from one that landed before or after a
//! concurrent snapshot. Taking a snapshot is itself lock-free and O(1) — it
//! swaps the root via a restricted double compare-single-swap (RDCSS)
//! rather than copying the tree, and subtrees are copied lazily, one branch
//! at a time, only when a write actually needs to diverge from an older
//! generation.
//!
//! # Key properties
//!
//! - **Lock-free**: every operation is a bounded retry loop over atomic
//!   compare-and-swaps; no thread ever holds a lock another thread could
//!   block on.
//! - **O(1) snapshotting**: [`Ctrie::snapshot`] does not walk the tree.
//! - **Zero `unsafe`**: enforced by `#![forbid(unsafe_code)]`; all shared
//!   ownership goes through `Arc` and `arc-swap`.
//!
//! # References
//!
//! - Prokopec, Bagwell, Odersky, 2011 — "Cache-Aware Lock-Free
//!   Concurrent Hash Tries"
//! - Prokopec, Bronson, Bagwell, Odersky, 2012 — "Concurrent Tries with
//!   Efficient Non-Blocking Snapshots"

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod cursor;
mod error;
mod gcas;
mod generation;
mod node;
mod ops;
mod rdcss;
mod result;
mod trie;

#[cfg(test)]
mod tests;

pub use cursor::Cursor;
pub use error::CoreError;
pub use result::{Entry, Insert, Lookup, Remove};
pub use trie::Ctrie;
