//! The [`RevisionSource`] trait.
//!
//! Sources turn an external history dump into a [`RevisionLog`]. They are
//! responsible for recomputing visibility (done by
//! [`Revision::try_from`](crate::revision::Revision)) and for reporting
//! where in the input a bad record was found.

use crate::log::RevisionLog;

/// Anything that can produce a complete revision log.
///
/// Loading is all-or-nothing: a source either yields every revision or
/// fails.
pub trait RevisionSource {
  type Error: std::error::Error + Send + Sync + 'static;

  fn load(self) -> Result<RevisionLog, Self::Error>;
}
