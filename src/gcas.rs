//! The GCAS (generation-aware compare-and-set) protocol.
//!
//! A plain CAS on an I-node's `main` pointer is not enough: a write that
//! lands during an in-progress snapshot must be detectable and, if the
//! snapshot won, rolled back. GCAS wraps every replacement main node in a
//! `previous` field recording what it replaced, and resolves that field —
//! committing or rolling back — the next time *anyone* reads through the
//! I-node. This makes the resolution cooperative: whichever thread gets
//! there first finishes the job, so no writer ever blocks waiting for
//! another to complete.

use std::sync::Arc;

use crate::generation::Generation;
use crate::node::{INode, MainNode, MainNodeContent, PrevSlot};

/// The ambient state a GCAS commit step needs to decide whether a pending
/// write may still land: the generation of the root as of "now", and
/// whether this handle is a read-only snapshot (which forbids every
/// pending write from committing, only ever rolling back).
pub(crate) trait GcasContext<K, V> {
    fn read_only(&self) -> bool;
    fn root_generation_for_commit(&self) -> Generation;
}

/// Reads an I-node's current, fully-resolved main node.
///
/// If the loaded node still has an unresolved `previous` field, this drives
/// the commit step to completion first — lookups are never allowed to
/// observe a main node that might still be rolled back out from under them.
pub(crate) fn gcas_read<K, V>(
    inode: &Arc<INode<K, V>>,
    ctx: &impl GcasContext<K, V>,
) -> Arc<MainNode<K, V>> {
    let main = inode.main.load_full();
    match &*main.prev.load() {
        PrevSlot::Committed => main,
        _ => gcas_commit(inode, main, ctx),
    }
}

/// Drives a main node's `previous` field to a terminal state (`Committed`
/// or `Failed`) and returns the main node that is actually in effect
/// afterwards — `n` itself if committed, or the restored predecessor if
/// rolled back.
fn gcas_commit<K, V>(
    inode: &Arc<INode<K, V>>,
    n: Arc<MainNode<K, V>>,
    ctx: &impl GcasContext<K, V>,
) -> Arc<MainNode<K, V>> {
    loop {
        let prev = n.prev.load_full();
        match &*prev {
            PrevSlot::Committed => return n,
            PrevSlot::Failed(old) => {
                let old = Arc::clone(old);
                let witness = inode.main.compare_and_swap(&n, Arc::clone(&old));
                if Arc::ptr_eq(&witness, &n) {
                    return old;
                }
                // Someone already moved main on; re-resolve from scratch.
                return gcas_read(inode, ctx);
            }
            PrevSlot::Pending(old) => {
                let old = Arc::clone(old);
                let same_generation = ctx.root_generation_for_commit() == inode.generation;
                if same_generation && !ctx.read_only() {
                    let witness = n
                        .prev
                        .compare_and_swap(&prev, Arc::new(PrevSlot::Committed));
                    if Arc::ptr_eq(&witness, &prev) {
                        return n;
                    }
                } else {
                    log::trace!("gcas: rolling back a pending write (generation stale or handle read-only)");
                    let witness = n
                        .prev
                        .compare_and_swap(&prev, Arc::new(PrevSlot::Failed(old)));
                    let _ = witness;
                }
                // Contended either way: loop and re-read this node's prev field.
            }
        }
    }
}

/// Attempts to replace `old` with a main node wrapping `new_content`.
/// Returns `true` only if the replacement both won its compare-and-swap and
/// survived the commit step.
pub(crate) fn gcas_write<K, V>(
    inode: &Arc<INode<K, V>>,
    old: &Arc<MainNode<K, V>>,
    new_content: MainNodeContent<K, V>,
    ctx: &impl GcasContext<K, V>,
) -> bool {
    let Some(new_node) = inode.begin_gcas(old, new_content) else {
        log::trace!("gcas: initial compare-and-swap lost a race");
        return false;
    };
    let committed = gcas_commit(inode, Arc::clone(&new_node), ctx);
    Arc::ptr_eq(&committed, &new_node)
}
