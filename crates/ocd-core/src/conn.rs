//! Connection identity

use std::fmt;

/// Identifier of one accepted client session.
///
/// Stands in for the underlying socket descriptor: components that schedule
/// deferred work capture a `ConnId`, never the connection itself, and must
/// treat a stale id as recoverable (the send fails harmlessly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
