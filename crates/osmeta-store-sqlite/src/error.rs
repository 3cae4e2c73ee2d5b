//! Error type for `osmeta-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Table names are restricted to ASCII letters, digits and underscores.
  #[error("invalid table name: {0:?}")]
  InvalidName(String),

  #[error("column {column}: cannot read {found} as {expected}")]
  Decode {
    column:   String,
    expected: &'static str,
    found:    &'static str,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
