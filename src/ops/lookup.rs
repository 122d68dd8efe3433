//! The lookup operation (§4.4): a pure descent that never mutates on a
//! read-only handle, but may still renew a stale branch it passes through
//! on a writable one.

use std::sync::Arc;

use crate::gcas::{gcas_read, gcas_write, GcasContext};
use crate::generation::Generation;
use crate::node::{flag, fragment, Branch, INode, MainNodeContent};
use crate::ops::maintenance::{clean, renew};
use crate::result::{Entry, Lookup, Signal};

#[allow(clippy::too_many_arguments)]
pub(crate) fn lookup_rec<K, V>(
    inode: &Arc<INode<K, V>>,
    parent: Option<(&Arc<INode<K, V>>, u32)>,
    start_generation: &Generation,
    hash: u32,
    key: &K,
    level: u32,
    read_only: bool,
    ctx: &impl GcasContext<K, V>,
) -> Signal<Lookup<K, V>>
where
    K: Eq,
{
    let main = gcas_read(inode, ctx);
    match &main.content {
        MainNodeContent::CNode(cnode) => {
            let frag = fragment(hash, level);
            let bit = flag(frag);
            if cnode.bitmap & bit == 0 {
                return Signal::Done(Lookup::Absent);
            }
            let idx = crate::node::position(cnode.bitmap, bit);
            match &cnode.array[idx] {
                Branch::Singleton(singleton) => {
                    if singleton.hash == hash && &singleton.key == key {
                        Signal::Done(Lookup::Present(Entry::from_singleton(Arc::clone(singleton))))
                    } else {
                        Signal::Done(Lookup::Absent)
                    }
                }
                Branch::Node(sub) => {
                    if read_only || sub.generation == *start_generation {
                        let sub = Arc::clone(sub);
                        lookup_rec(
                            &sub,
                            Some((inode, level)),
                            start_generation,
                            hash,
                            key,
                            level + crate::node::BITS_PER_LEVEL,
                            read_only,
                            ctx,
                        )
                    } else {
                        let renewed = renew(cnode, start_generation.clone(), ctx);
                        let _ = gcas_write(inode, &main, MainNodeContent::CNode(renewed), ctx);
                        Signal::Restart
                    }
                }
            }
        }
        MainNodeContent::Tomb(singleton) => {
            if read_only {
                if singleton.hash == hash && &singleton.key == key {
                    Signal::Done(Lookup::Present(Entry::from_singleton(Arc::clone(singleton))))
                } else {
                    Signal::Done(Lookup::Absent)
                }
            } else {
                if let Some((parent, parent_level)) = parent {
                    clean(parent, parent_level, ctx);
                }
                Signal::Restart
            }
        }
        MainNodeContent::Collision(collision) => match collision.find(key) {
            Some(singleton) => Signal::Done(Lookup::Present(Entry::from_singleton(Arc::clone(singleton)))),
            None => Signal::Done(Lookup::Absent),
        },
    }
}
