//! Column selection by regular expression.

use regex::Regex;

use crate::{Result, frame::Frame};

/// Keep the columns whose name matches `pattern` anywhere.
pub fn select_matching(frame: &Frame, pattern: &str) -> Result<Frame> {
  let re = Regex::new(pattern)?;
  Ok(frame.retain_columns(|name| re.is_match(name)))
}

/// Remove the columns whose name matches `pattern` anywhere.
pub fn drop_matching(frame: &Frame, pattern: &str) -> Result<Frame> {
  let re = Regex::new(pattern)?;
  Ok(frame.retain_columns(|name| !re.is_match(name)))
}
