//! Error types.

use std::error::Error;
use std::fmt;

/// Programmer errors reported at the [`Ctrie`](crate::Ctrie) boundary.
///
/// Internal retry signalling (the `RESTART` outcome a helping operation can
/// hit when it loses a race) never reaches this type — it is resolved by
/// the operation's own retry loop before `insert`/`remove`/`lookup` return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// A mutating call (`insert` or `remove`) was made on a handle obtained
    /// as a read-only snapshot.
    ReadOnly,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "cannot mutate a read-only snapshot"),
        }
    }
}

impl Error for CoreError {}
