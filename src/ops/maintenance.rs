//! Structural maintenance: generation renewal and tombstone cleanup.

use std::sync::Arc;

use crate::gcas::{gcas_read, gcas_write, GcasContext};
use crate::generation::Generation;
use crate::node::{flag, fragment, Branch, CNode, INode, MainNodeContent};
use crate::rdcss::{rdcss_read_root, RootContext};

/// Copies an I-node's currently committed content into a fresh I-node
/// stamped with `generation`, without touching the content itself — the
/// subtree below is still shared, and will only fork further down the next
/// time a write actually lands in it.
pub(crate) fn copy_to_generation<K, V>(
    inode: &Arc<INode<K, V>>,
    generation: Generation,
    ctx: &impl GcasContext<K, V>,
) -> Arc<INode<K, V>> {
    let main = gcas_read(inode, ctx);
    INode::with_main(main, generation)
}

/// Rebuilds a CNode under a new generation, lazily renewing any child
/// I-node that still belongs to an older one.
pub(crate) fn renew<K, V>(
    cnode: &CNode<K, V>,
    generation: Generation,
    ctx: &impl GcasContext<K, V>,
) -> CNode<K, V> {
    let array: Vec<Branch<K, V>> = cnode
        .array
        .iter()
        .map(|branch| match branch {
            Branch::Singleton(singleton) => Branch::Singleton(Arc::clone(singleton)),
            Branch::Node(inode) => Branch::Node(copy_to_generation(inode, generation.clone(), ctx)),
        })
        .collect();
    CNode {
        bitmap: cnode.bitmap,
        array: array.into_boxed_slice(),
        generation,
    }
}

/// Resolves every directly reachable Tomb child of `cnode` back into an
/// inline singleton, then contracts if that leaves a single survivor.
fn compress<K, V>(
    cnode: &CNode<K, V>,
    level: u32,
    ctx: &impl GcasContext<K, V>,
) -> MainNodeContent<K, V> {
    let resolved: Vec<Branch<K, V>> = cnode
        .array
        .iter()
        .map(|branch| match branch {
            Branch::Singleton(singleton) => Branch::Singleton(Arc::clone(singleton)),
            Branch::Node(sub) => {
                let sub_main = gcas_read(sub, ctx);
                match &sub_main.content {
                    MainNodeContent::Tomb(singleton) => Branch::Singleton(Arc::clone(singleton)),
                    _ => Branch::Node(Arc::clone(sub)),
                }
            }
        })
        .collect();
    crate::node::contract(cnode.bitmap, resolved, cnode.generation.clone(), level)
}

/// Best-effort repair of an I-node found holding a stale CNode: resolves
/// any dead Tomb children and writes the compressed result back.
///
/// Idempotent and safe to call speculatively — if the GCAS loses a race the
/// caller simply restarts, and some other operation's own cleanup (or the
/// next `clean` call) will make progress instead.
pub(crate) fn clean<K, V>(inode: &Arc<INode<K, V>>, level: u32, ctx: &impl GcasContext<K, V>) {
    let m = gcas_read(inode, ctx);
    if let MainNodeContent::CNode(cnode) = &m.content {
        let compressed = compress(cnode, level, ctx);
        if !gcas_write(inode, &m, compressed, ctx) {
            log::trace!("clean: compression lost a race, leaving it for the next visitor");
        }
    }
}

/// Re-descends from `parent` to confirm it still points at `child` at this
/// hash/level; if `child` has since become a Tomb, replaces that slot in
/// `parent` with the tomb's singleton directly, skipping the indirection.
///
/// Retries while the root still belongs to `start_generation` and the GCAS
/// keeps losing to contention, rather than giving up after one attempt —
/// letting a repair opportunistically complete is cheap and avoids leaving
/// a dead I-node reachable from the parent for longer than necessary.
pub(crate) fn clean_parent<K, V>(
    parent: &Arc<INode<K, V>>,
    child: &Arc<INode<K, V>>,
    start_generation: &Generation,
    hash: u32,
    level: u32,
    ctx: &(impl RootContext<K, V> + GcasContext<K, V>),
) {
    loop {
        let parent_main = gcas_read(parent, ctx);
        let cnode = match &parent_main.content {
            MainNodeContent::CNode(cnode) => cnode,
            _ => return,
        };
        let frag = fragment(hash, level);
        let bit = flag(frag);
        if cnode.bitmap & bit == 0 {
            return;
        }
        let idx = crate::node::position(cnode.bitmap, bit);
        let still_same_child = matches!(&cnode.array[idx], Branch::Node(n) if Arc::ptr_eq(n, child));
        if !still_same_child {
            return;
        }
        let child_main = gcas_read(child, ctx);
        let tomb = match &child_main.content {
            MainNodeContent::Tomb(singleton) => Arc::clone(singleton),
            _ => return,
        };
        let new_array: Vec<Branch<K, V>> = cnode
            .array
            .iter()
            .enumerate()
            .map(|(i, branch)| {
                if i == idx {
                    Branch::Singleton(Arc::clone(&tomb))
                } else {
                    branch.clone()
                }
            })
            .collect();
        let contracted = crate::node::contract(cnode.bitmap, new_array, cnode.generation.clone(), level);
        if gcas_write(parent, &parent_main, contracted, ctx) {
            return;
        }
        let current_generation = rdcss_read_root(ctx, false).generation.clone();
        if current_generation != *start_generation {
            return;
        }
    }
}
