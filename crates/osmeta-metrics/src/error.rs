use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid column pattern: {0}")]
  Pattern(#[from] regex::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialisation error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
