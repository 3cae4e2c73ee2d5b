//! JSON Lines revision records: one serialised [`NewRevision`] per line.
//!
//! Used to cache a parsed history so later runs skip the XML pass.

use std::{
  fs::File,
  io::{BufRead, BufReader, Write},
  path::Path,
};

use osmeta_core::{
  log::RevisionLog,
  revision::{NewRevision, Revision},
  source::RevisionSource,
};

use crate::error::{Error, Result};

/// Reads [`NewRevision`]s from a JSON Lines stream. Blank lines are skipped.
pub struct JsonLinesHistory<R> {
  input: R,
}

impl JsonLinesHistory<BufReader<File>> {
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    Ok(Self::new(BufReader::new(File::open(path)?)))
  }
}

impl<R: BufRead> JsonLinesHistory<R> {
  pub fn new(input: R) -> Self { Self { input } }

  /// All records with their 1-based line numbers.
  pub fn records(self) -> Result<Vec<(usize, NewRevision)>> {
    let mut records = Vec::new();
    for (index, line) in self.input.lines().enumerate() {
      let line = line?;
      if line.trim().is_empty() {
        continue;
      }
      let number = index + 1;
      let record = serde_json::from_str(&line).map_err(|source| Error::JsonLine {
        line: number,
        source,
      })?;
      records.push((number, record));
    }
    Ok(records)
  }
}

impl<R: BufRead> RevisionSource for JsonLinesHistory<R> {
  type Error = Error;

  fn load(self) -> Result<RevisionLog> {
    let revisions = self
      .records()?
      .into_iter()
      .map(|(line, record)| {
        Revision::try_from(record).map_err(|source| Error::JsonRecord { line, source })
      })
      .collect::<Result<Vec<_>>>()?;
    tracing::debug!(revisions = revisions.len(), "parsed json lines history");
    Ok(RevisionLog::new(revisions)?)
  }
}

/// Write `records` as JSON Lines. Returns the number of records written.
pub fn write_jsonl<'a, W, I>(mut output: W, records: I) -> Result<usize>
where
  W: Write,
  I: IntoIterator<Item = &'a NewRevision>,
{
  let mut written = 0;
  for record in records {
    serde_json::to_writer(&mut output, record)?;
    output.write_all(b"\n")?;
    written += 1;
  }
  output.flush()?;
  Ok(written)
}
