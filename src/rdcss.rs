//! The RDCSS (restricted double compare-single-swap) protocol.
//!
//! Taking a snapshot means swapping the trie's root atomically while also
//! checking that the old root's content hasn't changed since it was last
//! observed — an ordinary CAS only compares one location. RDCSS gets this
//! by publishing a descriptor in the root slot first, then letting whoever
//! next reads the root (the initiator or any helper) resolve it into either
//! the new root (if the guard held) or the unchanged old root (if it
//! didn't).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::gcas::{gcas_read, GcasContext};
use crate::generation::Generation;
use crate::node::{INode, MainNode};

/// What the trie's root slot currently holds: either a plain root I-node,
/// or an in-progress RDCSS descriptor swapping one in.
pub(crate) enum RootSlot<K, V> {
    Root(Arc<INode<K, V>>),
    Descriptor(Arc<RdcssDescriptor<K, V>>),
}

/// A published intent to swap `old_root` for `new_root`, conditioned on
/// `old_root`'s main node still being `expected_main`.
pub(crate) struct RdcssDescriptor<K, V> {
    old_root: Arc<INode<K, V>>,
    expected_main: Arc<MainNode<K, V>>,
    new_root: Arc<INode<K, V>>,
    committed: AtomicBool,
}

/// Anything that exposes a root slot for the RDCSS helping protocol to
/// operate on, on top of the GCAS context every I-node read already needs.
pub(crate) trait RootContext<K, V>: GcasContext<K, V> {
    fn root_slot(&self) -> &ArcSwap<RootSlot<K, V>>;
}

fn load_root_slot<K, V>(ctx: &impl RootContext<K, V>) -> Arc<RootSlot<K, V>> {
    ctx.root_slot().load_full()
}

/// Reads the trie's current root I-node, helping complete any in-flight
/// RDCSS it finds along the way.
///
/// `abort`, when set, makes the helper tear the descriptor back down to the
/// old root rather than trying to complete it — used by the GCAS commit
/// step's own root sample (see `crate::gcas`) so that merely *checking* the
/// root's generation never has the side effect of finishing someone else's
/// snapshot.
pub(crate) fn rdcss_read_root<K, V>(ctx: &impl RootContext<K, V>, abort: bool) -> Arc<INode<K, V>> {
    loop {
        let slot = load_root_slot(ctx);
        match &*slot {
            RootSlot::Root(root) => return Arc::clone(root),
            RootSlot::Descriptor(desc) => {
                rdcss_complete(ctx, &slot, Arc::clone(desc), abort);
            }
        }
    }
}

/// Convenience used by [`GcasContext`] implementors: the generation that
/// should govern whether a pending GCAS write may still commit.
pub(crate) fn root_generation_via_rdcss<K, V>(ctx: &impl RootContext<K, V>) -> Generation {
    rdcss_read_root(ctx, true).generation.clone()
}

fn rdcss_complete<K, V>(
    ctx: &impl RootContext<K, V>,
    current_slot: &Arc<RootSlot<K, V>>,
    desc: Arc<RdcssDescriptor<K, V>>,
    abort: bool,
) {
    if abort {
        let target = Arc::new(RootSlot::Root(Arc::clone(&desc.old_root)));
        let _ = ctx.root_slot().compare_and_swap(current_slot, target);
        return;
    }
    let current_main = gcas_read(&desc.old_root, ctx);
    let matches = Arc::ptr_eq(&current_main, &desc.expected_main);
    let target = if matches {
        Arc::new(RootSlot::Root(Arc::clone(&desc.new_root)))
    } else {
        Arc::new(RootSlot::Root(Arc::clone(&desc.old_root)))
    };
    let witness = ctx.root_slot().compare_and_swap(current_slot, target);
    if matches && Arc::ptr_eq(&witness, current_slot) {
        desc.committed.store(true, Ordering::SeqCst);
    }
}

/// Atomically replaces the trie's root with an I-node built from whatever
/// main content the root *actually* holds at the moment of the swap.
///
/// `build` is handed the freshly GCAS-read main content of the current root
/// and must produce the replacement I-node; it is the only way to observe
/// that content, which closes the race a two-step "read root, build
/// replacement, then RDCSS it in" sequence would otherwise have: if a write
/// landed between the read and the swap, a replacement built from stale
/// content would silently clobber it. Because `build` runs again on every
/// retry with a freshly observed root, the content it sees and the content
/// RDCSS guards the swap against are always the same read.
///
/// On success, returns the main content the swap observed and installed —
/// the caller needs it to construct an independent handle over the same
/// content under its own generation.
pub(crate) fn rdcss_root_rebuild<K, V>(
    ctx: &impl RootContext<K, V>,
    build: impl Fn(&Arc<MainNode<K, V>>) -> Arc<INode<K, V>>,
) -> Arc<MainNode<K, V>> {
    loop {
        let slot = load_root_slot(ctx);
        let old_root = match &*slot {
            RootSlot::Root(root) => Arc::clone(root),
            RootSlot::Descriptor(desc) => {
                rdcss_complete(ctx, &slot, Arc::clone(desc), false);
                continue;
            }
        };
        let expected_main = gcas_read(&old_root, ctx);
        let new_root = build(&expected_main);
        let desc = Arc::new(RdcssDescriptor {
            old_root,
            expected_main: Arc::clone(&expected_main),
            new_root,
            committed: AtomicBool::new(false),
        });
        let desc_slot = Arc::new(RootSlot::Descriptor(Arc::clone(&desc)));
        let witness = ctx.root_slot().compare_and_swap(&slot, Arc::clone(&desc_slot));
        if !Arc::ptr_eq(&witness, &slot) {
            continue;
        }
        rdcss_complete(ctx, &desc_slot, Arc::clone(&desc), false);
        if desc.committed.load(Ordering::SeqCst) {
            return expected_main;
        }
        log::debug!("rdcss: root changed out from under a rebuild attempt, retrying");
    }
}
