//! Error types for `osmeta-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A record that cannot enter a [`RevisionLog`](crate::log::RevisionLog).
  #[error("malformed revision {record}: {reason}")]
  MalformedRevision { record: String, reason: String },
}

impl Error {
  pub fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::MalformedRevision {
      record: record.into(),
      reason: reason.into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
