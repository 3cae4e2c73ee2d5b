//! Entity identity: the `(kind, id)` pair every revision belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// OSM identifiers are signed: negative ids appear in unsaved editor data.
pub type EntityId = i64;
pub type ContributorId = i64;
pub type ChangesetId = i64;

/// The three element types of the OSM data model.
///
/// The ordering (node < way < relation) is the one used for every sorted
/// output.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  #[default]
  Node,
  Way,
  Relation,
}

impl EntityKind {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// Identifies one entity across all of its versions.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
)]
pub struct EntityKey {
  pub kind: EntityKind,
  pub id:   EntityId,
}

impl EntityKey {
  pub fn new(kind: EntityKind, id: EntityId) -> Self { Self { kind, id } }
}

impl fmt::Display for EntityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.kind, self.id)
  }
}
