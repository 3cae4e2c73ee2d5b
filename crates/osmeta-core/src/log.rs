//! [`RevisionLog`]: the validated, in-memory history table.

use std::collections::BTreeSet;

use crate::{
  Error, Result,
  entity::EntityKey,
  revision::{NewRevision, Revision},
};

/// Every revision of every entity, sorted by `(kind, id, version)`.
///
/// Built once per run and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevisionLog {
  revisions: Vec<Revision>,
}

impl RevisionLog {
  /// Sort `revisions` and reject duplicated `(kind, id, version)` triples.
  pub fn new(mut revisions: Vec<Revision>) -> Result<Self> {
    revisions.sort_by_key(|r| (r.kind, r.id, r.version));
    if let Some(pair) = revisions
      .windows(2)
      .find(|w| w[0].key() == w[1].key() && w[0].version == w[1].version)
    {
      return Err(Error::malformed(
        format!("{} v{}", pair[1].key(), pair[1].version),
        "duplicate version",
      ));
    }
    Ok(Self { revisions })
  }

  /// Validate source records and build the log.
  pub fn from_new<I>(records: I) -> Result<Self>
  where
    I: IntoIterator<Item = NewRevision>,
  {
    let revisions = records
      .into_iter()
      .map(Revision::try_from)
      .collect::<Result<Vec<_>>>()?;
    Self::new(revisions)
  }

  pub fn revisions(&self) -> &[Revision] { &self.revisions }

  pub fn iter(&self) -> std::slice::Iter<'_, Revision> { self.revisions.iter() }

  pub fn len(&self) -> usize { self.revisions.len() }

  pub fn is_empty(&self) -> bool { self.revisions.is_empty() }

  /// The revisions of each entity, in version order.
  pub fn entities(&self) -> impl Iterator<Item = &[Revision]> {
    self.revisions.chunk_by(|a, b| a.key() == b.key())
  }

  pub fn entity_keys(&self) -> BTreeSet<EntityKey> {
    self.revisions.iter().map(Revision::key).collect()
  }
}

impl<'a> IntoIterator for &'a RevisionLog {
  type Item = &'a Revision;
  type IntoIter = std::slice::Iter<'a, Revision>;

  fn into_iter(self) -> Self::IntoIter { self.revisions.iter() }
}
