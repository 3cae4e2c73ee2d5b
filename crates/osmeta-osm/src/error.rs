//! Error types for the history readers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("xml error at byte {offset}: {message}")]
  Xml { offset: u64, message: String },

  #[error("<{element}> at byte {offset} has no {attribute:?} attribute")]
  MissingAttribute {
    element:   &'static str,
    attribute: &'static str,
    offset:    u64,
  },

  #[error("<{element}> at byte {offset}: invalid {attribute} {value:?}: {reason}")]
  InvalidAttribute {
    element:   &'static str,
    attribute: &'static str,
    value:     String,
    reason:    String,
    offset:    u64,
  },

  #[error("record at byte {offset}: {source}")]
  XmlRecord {
    offset: u64,
    #[source]
    source: osmeta_core::Error,
  },

  #[error("line {line}: {source}")]
  JsonLine {
    line:   usize,
    #[source]
    source: serde_json::Error,
  },

  #[error("line {line}: {source}")]
  JsonRecord {
    line:   usize,
    #[source]
    source: osmeta_core::Error,
  },

  #[error("core error: {0}")]
  Core(#[from] osmeta_core::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
