//! The read-only traversal cursor (§4.9).

use std::sync::Arc;

use crate::gcas::{gcas_read, GcasContext};
use crate::node::{INode, MainNode, MainNodeContent};
use crate::result::Entry;

enum Frame<K, V> {
    Node(Arc<INode<K, V>>),
    Cnode { main: Arc<MainNode<K, V>>, next: usize },
    Collision { main: Arc<MainNode<K, V>>, next: usize },
}

/// A depth-first walk over a frozen snapshot.
///
/// The frame stack is a plain growable `Vec`, so depth is bounded only by
/// available memory rather than any fixed constant — unlike a fixed-size
/// stack, it cannot be exhausted by a pathologically deep trie built from
/// many colliding hash prefixes.
pub struct Cursor<'a, K, V, S> {
    ctx: &'a crate::trie::Ctrie<K, V, S>,
    stack: Vec<Frame<K, V>>,
}

impl<'a, K, V, S> Cursor<'a, K, V, S> {
    pub(crate) fn new(ctx: &'a crate::trie::Ctrie<K, V, S>, root: Arc<INode<K, V>>) -> Self {
        Self {
            ctx,
            stack: vec![Frame::Node(root)],
        }
    }
}

impl<'a, K, V, S> Iterator for Cursor<'a, K, V, S> {
    type Item = Entry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Node(inode) => {
                    let main = gcas_read(&inode, self.ctx);
                    match &main.content {
                        MainNodeContent::CNode(cnode) => {
                            if !cnode.array.is_empty() {
                                self.stack.push(Frame::Cnode { main, next: 0 });
                            }
                        }
                        MainNodeContent::Tomb(singleton) => {
                            return Some(Entry::from_singleton(Arc::clone(singleton)));
                        }
                        MainNodeContent::Collision(collision) => {
                            if !collision.entries.is_empty() {
                                self.stack.push(Frame::Collision { main, next: 0 });
                            }
                        }
                    }
                }
                Frame::Cnode { main, next } => {
                    let MainNodeContent::CNode(cnode) = &main.content else {
                        unreachable!("cnode frame always wraps cnode content");
                    };
                    if next + 1 < cnode.array.len() {
                        self.stack.push(Frame::Cnode {
                            main: Arc::clone(&main),
                            next: next + 1,
                        });
                    }
                    match &cnode.array[next] {
                        crate::node::Branch::Singleton(singleton) => {
                            return Some(Entry::from_singleton(Arc::clone(singleton)));
                        }
                        crate::node::Branch::Node(inode) => {
                            self.stack.push(Frame::Node(Arc::clone(inode)));
                        }
                    }
                }
                Frame::Collision { main, next } => {
                    let MainNodeContent::Collision(collision) = &main.content else {
                        unreachable!("collision frame always wraps collision content");
                    };
                    if next + 1 < collision.entries.len() {
                        self.stack.push(Frame::Collision {
                            main: Arc::clone(&main),
                            next: next + 1,
                        });
                    }
                    return Some(Entry::from_singleton(Arc::clone(&collision.entries[next])));
                }
            }
        }
        None
    }
}
