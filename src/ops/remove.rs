//! The remove operation (§4.6), including witness-value-conditional removal
//! and eager parent contraction.

use std::sync::Arc;

use crate::gcas::{gcas_read, gcas_write, GcasContext};
use crate::generation::Generation;
use crate::node::{flag, fragment, Branch, INode, MainNodeContent};
use crate::ops::maintenance::{clean, clean_parent, renew};
use crate::rdcss::RootContext;
use crate::result::{Entry, Remove, Signal};

#[allow(clippy::too_many_arguments)]
pub(crate) fn remove_rec<K, V>(
    inode: &Arc<INode<K, V>>,
    parent: Option<(&Arc<INode<K, V>>, u32)>,
    start_generation: &Generation,
    hash: u32,
    key: &K,
    witness: Option<&V>,
    level: u32,
    ctx: &(impl RootContext<K, V> + GcasContext<K, V>),
) -> Signal<Remove<K, V>>
where
    K: Eq,
    V: PartialEq,
{
    let main = gcas_read(inode, ctx);
    match &main.content {
        MainNodeContent::CNode(cnode) => {
            let frag = fragment(hash, level);
            let bit = flag(frag);
            if cnode.bitmap & bit == 0 {
                return Signal::Done(Remove::Absent);
            }
            let idx = crate::node::position(cnode.bitmap, bit);
            match &cnode.array[idx] {
                Branch::Node(sub) => {
                    if sub.generation == *start_generation {
                        let sub = Arc::clone(sub);
                        let outcome = remove_rec(
                            &sub,
                            Some((inode, level)),
                            start_generation,
                            hash,
                            key,
                            witness,
                            level + crate::node::BITS_PER_LEVEL,
                            ctx,
                        );
                        if let Signal::Done(Remove::Removed(_)) = &outcome {
                            clean_parent(inode, &sub, start_generation, hash, level, ctx);
                        }
                        outcome
                    } else {
                        let renewed = renew(cnode, start_generation.clone(), ctx);
                        let _ = gcas_write(inode, &main, MainNodeContent::CNode(renewed), ctx);
                        Signal::Restart
                    }
                }
                Branch::Singleton(singleton) => {
                    if singleton.hash != hash || &singleton.key != key {
                        return Signal::Done(Remove::Absent);
                    }
                    if let Some(expected) = witness {
                        if &singleton.value != expected {
                            return Signal::Done(Remove::Absent);
                        }
                    }
                    let contracted = cnode.without(idx, bit, level);
                    if gcas_write(inode, &main, contracted, ctx) {
                        Signal::Done(Remove::Removed(Entry::from_singleton(Arc::clone(singleton))))
                    } else {
                        Signal::Restart
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
        MainNodeContent::Collision(collision) => match collision.find(key) {
            None => Signal::Done(Remove::Absent),
            Some(singleton) => {
                if singleton.hash != hash {
                    return Signal::Done(Remove::Absent);
                }
                if let Some(expected) = witness {
                    if &singleton.value != expected {
                        return Signal::Done(Remove::Absent);
                    }
                }
                let removed = Entry::from_singleton(Arc::clone(singleton));
                let new_content = collision.without(key);
                if gcas_write(inode, &main, new_content, ctx) {
                    Signal::Done(Remove::Removed(removed))
                } else {
                    Signal::Restart
                }
            }
        },
    }
}
