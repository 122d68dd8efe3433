//! Snapshot generations.
//!
//! A generation is an opaque identity, not a counter: two generations are
//! equal only if they are literally the same allocation. Comparing against
//! it tells an operation whether the branch it is looking at was built
//! before or after the most recent [`snapshot`](crate::Ctrie::snapshot),
//! without ever reading a clock or a version number.

use std::fmt;
use std::sync::Arc;

/// Marks the snapshot epoch an I-node or CNode belongs to.
///
/// Cloning a `Generation` is cheap (an `Arc` bump) and preserves identity:
/// clones of the same generation still compare equal to each other, while a
/// freshly minted generation never compares equal to any other.
#[derive(Clone)]
pub(crate) struct Generation(Arc<Token>);

struct Token;

impl Generation {
    /// Mints a brand new, never-before-seen generation.
    pub(crate) fn new() -> Self {
        Self(Arc::new(Token))
    }
}

impl PartialEq for Generation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Generation {}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generation({:p})", Arc::as_ptr(&self.0))
    }
}
