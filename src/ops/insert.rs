//! The insert operation (§4.5).

use std::hash::Hash;
use std::sync::Arc;

use crate::gcas::{gcas_read, gcas_write, GcasContext};
use crate::generation::Generation;
use crate::node::{flag, fragment, Branch, CNode, INode, MainNodeContent, Singleton};
use crate::ops::maintenance::{clean, renew};
use crate::result::{Entry, Insert, Signal};

/// Builds the subtree needed to separate two colliding singletons, creating
/// one more level of CNode per shared address fragment until their hashes
/// diverge, or falling back to a [`CollisionNode`](crate::node::CollisionNode)
/// once the 32-bit hash is fully consumed.
fn create_subtree<K: Eq, V>(
    a: Arc<Singleton<K, V>>,
    b: Arc<Singleton<K, V>>,
    level: u32,
    generation: Generation,
) -> Arc<INode<K, V>> {
    if level > crate::node::MAX_LEVEL {
        return INode::new(
            MainNodeContent::Collision(crate::node::CollisionNode {
                hash: a.hash,
                entries: vec![a, b],
            }),
            generation,
        );
    }
    let fa = fragment(a.hash, level);
    let fb = fragment(b.hash, level);
    if fa == fb {
        let child = create_subtree(a, b, level + crate::node::BITS_PER_LEVEL, generation.clone());
        let array = vec![Branch::Node(child)].into_boxed_slice();
        INode::new(
            MainNodeContent::CNode(CNode {
                bitmap: flag(fa),
                array,
                generation: generation.clone(),
            }),
            generation,
        )
    } else {
        let (lo, hi) = if fa < fb { (a, b) } else { (b, a) };
        let array = vec![Branch::Singleton(lo), Branch::Singleton(hi)].into_boxed_slice();
        INode::new(
            MainNodeContent::CNode(CNode {
                bitmap: flag(fa) | flag(fb),
                array,
                generation: generation.clone(),
            }),
            generation,
        )
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_rec<K, V>(
    inode: &Arc<INode<K, V>>,
    parent: Option<(&Arc<INode<K, V>>, u32)>,
    start_generation: &Generation,
    entry: Arc<Singleton<K, V>>,
    level: u32,
    only_if_absent: bool,
    ctx: &impl GcasContext<K, V>,
) -> Signal<Insert<K, V>>
where
    K: Hash + Eq,
{
    let main = gcas_read(inode, ctx);
    match &main.content {
        MainNodeContent::CNode(cnode) => {
            let frag = fragment(entry.hash, level);
            let bit = flag(frag);
            if cnode.bitmap & bit == 0 {
                let (base, base_generation) = if cnode.generation != *start_generation {
                    (renew(cnode, start_generation.clone(), ctx), start_generation.clone())
                } else {
                    (clone_shallow(cnode), cnode.generation.clone())
                };
                let new_cnode = base.with_inserted(bit, Branch::Singleton(Arc::clone(&entry)), base_generation);
                if gcas_write(inode, &main, MainNodeContent::CNode(new_cnode), ctx) {
                    Signal::Done(Insert::Inserted)
                } else {
                    Signal::Restart
                }
            } else {
                let idx = crate::node::position(cnode.bitmap, bit);
                match &cnode.array[idx] {
                    Branch::Node(sub) => {
                        if sub.generation == *start_generation {
                            let sub = Arc::clone(sub);
                            insert_rec(
                                &sub,
                                Some((inode, level)),
                                start_generation,
                                entry,
                                level + crate::node::BITS_PER_LEVEL,
                                only_if_absent,
                                ctx,
                            )
                        } else {
                            let renewed = renew(cnode, start_generation.clone(), ctx);
                            let _ = gcas_write(inode, &main, MainNodeContent::CNode(renewed), ctx);
                            Signal::Restart
                        }
                    }
                    Branch::Singleton(existing) => {
                        if existing.hash == entry.hash && existing.key == entry.key {
                            if only_if_absent {
                                return Signal::Done(Insert::Replaced(Entry::from_singleton(Arc::clone(existing))));
                            }
                            let new_cnode = cnode.with_replaced(idx, Branch::Singleton(Arc::clone(&entry)));
                            if gcas_write(inode, &main, MainNodeContent::CNode(new_cnode), ctx) {
                                Signal::Done(Insert::Replaced(Entry::from_singleton(Arc::clone(existing))))
                            } else {
                                Signal::Restart
                            }
                        } else {
                            let subtree = create_subtree(
                                Arc::clone(existing),
                                Arc::clone(&entry),
                                level + crate::node::BITS_PER_LEVEL,
                                start_generation.clone(),
                            );
                            let new_cnode = cnode.with_replaced(idx, Branch::Node(subtree));
                            if gcas_write(inode, &main, MainNodeContent::CNode(new_cnode), ctx) {
                                Signal::Done(Insert::Inserted)
                            } else {
                                Signal::Restart
                            }
                        }
                    }
                }
            }
        }
        MainNodeContent::Tomb(_) => {
            if let Some((parent, parent_level)) = parent {
                clean(parent, parent_level, ctx);
            }
            Signal::Restart
        }
        MainNodeContent::Collision(collision) => {
            match collision.find(&entry.key) {
                Some(existing) if only_if_absent => {
                    Signal::Done(Insert::Replaced(Entry::from_singleton(Arc::clone(existing))))
                }
                Some(existing) => {
                    let replaced = Entry::from_singleton(Arc::clone(existing));
                    let new_content = collision.with_upserted(Arc::clone(&entry));
                    if gcas_write(inode, &main, new_content, ctx) {
                        Signal::Done(Insert::Replaced(replaced))
                    } else {
                        Signal::Restart
                    }
                }
                None => {
                    let new_content = collision.with_upserted(Arc::clone(&entry));
                    if gcas_write(inode, &main, new_content, ctx) {
                        Signal::Done(Insert::Inserted)
                    } else {
                        Signal::Restart
                    }
                }
            }
        }
    }
}

fn clone_shallow<K, V>(cnode: &CNode<K, V>) -> CNode<K, V> {
    CNode {
        bitmap: cnode.bitmap,
        array: cnode.array.iter().cloned().collect(),
        generation: cnode.generation.clone(),
    }
}
