//! Revision types: one historical version of one entity.
//!
//! A [`NewRevision`] is what a source delivers: identity, provenance and the
//! kind-specific payload, but no visibility flag. Upstream `visible` flags
//! are unreliable in history dumps, so a [`Revision`] recomputes it from the
//! payload when it is validated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  entity::{ChangesetId, ContributorId, EntityId, EntityKey, EntityKind},
};

// ─── Payload ─────────────────────────────────────────────────────────────────

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub lat: f64,
  pub lon: f64,
}

impl Location {
  pub fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }

  /// Finite and within the WGS84 bounds.
  pub fn is_valid(&self) -> bool {
    self.lat.is_finite()
      && self.lon.is_finite()
      && (-90.0..=90.0).contains(&self.lat)
      && (-180.0..=180.0).contains(&self.lon)
  }
}

/// One member of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
  pub ref_id:   EntityId,
  pub role:     String,
  pub ref_type: EntityKind,
}

/// The kind-specific part of a revision. The variant determines the entity
/// kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
  /// `None` when the node carries no (or an invalid) location.
  Node(Option<Location>),
  /// Ordered node references.
  Way(Vec<EntityId>),
  /// Ordered members.
  Relation(Vec<Member>),
}

impl Payload {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Node(_) => EntityKind::Node,
      Self::Way(_) => EntityKind::Way,
      Self::Relation(_) => EntityKind::Relation,
    }
  }

  /// Whether this payload is evidence that the entity exists.
  ///
  /// A relation with no members survives as long as it still has tags.
  pub fn survives(&self, tag_count: usize) -> bool {
    match self {
      Self::Node(location) => location.is_some_and(|l| l.is_valid()),
      Self::Way(nodes) => !nodes.is_empty(),
      Self::Relation(members) => !members.is_empty() || tag_count > 0,
    }
  }
}

// ─── NewRevision ─────────────────────────────────────────────────────────────

/// A revision as produced by a revision source, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRevision {
  pub kind:           EntityKind,
  pub id:             EntityId,
  pub version:        u32,
  pub timestamp:      DateTime<Utc>,
  pub contributor_id: ContributorId,
  pub changeset_id:   ChangesetId,
  #[serde(default)]
  pub tag_keys:       Vec<String>,
  pub payload:        Payload,
}

impl NewRevision {
  /// Build a revision whose kind is taken from the payload.
  pub fn new(
    id: EntityId,
    version: u32,
    timestamp: DateTime<Utc>,
    contributor_id: ContributorId,
    changeset_id: ChangesetId,
    payload: Payload,
  ) -> Self {
    Self {
      kind: payload.kind(),
      id,
      version,
      timestamp,
      contributor_id,
      changeset_id,
      tag_keys: Vec::new(),
      payload,
    }
  }

  pub fn with_tags<I, S>(mut self, keys: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.tag_keys = keys.into_iter().map(Into::into).collect();
    self
  }

  fn describe(&self) -> String {
    format!("{}/{} v{}", self.kind, self.id, self.version)
  }
}

// ─── Revision ────────────────────────────────────────────────────────────────

/// A validated revision. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
  pub kind:           EntityKind,
  pub id:             EntityId,
  pub version:        u32,
  /// Recomputed from the payload; never taken from the source.
  pub visible:        bool,
  pub timestamp:      DateTime<Utc>,
  pub contributor_id: ContributorId,
  pub changeset_id:   ChangesetId,
  pub tag_count:      usize,
  pub tag_keys:       Vec<String>,
  pub payload:        Payload,
}

impl Revision {
  pub fn key(&self) -> EntityKey { EntityKey::new(self.kind, self.id) }
}

impl TryFrom<NewRevision> for Revision {
  type Error = Error;

  fn try_from(new: NewRevision) -> Result<Self> {
    if new.version == 0 {
      return Err(Error::malformed(new.describe(), "version must be >= 1"));
    }
    if new.kind != new.payload.kind() {
      return Err(Error::malformed(
        new.describe(),
        format!("{} payload on a {}", new.payload.kind(), new.kind),
      ));
    }

    let tag_count = new.tag_keys.len();
    Ok(Self {
      kind: new.kind,
      id: new.id,
      version: new.version,
      visible: new.payload.survives(tag_count),
      timestamp: new.timestamp,
      contributor_id: new.contributor_id,
      changeset_id: new.changeset_id,
      tag_count,
      tag_keys: new.tag_keys,
      payload: new.payload,
    })
  }
}
