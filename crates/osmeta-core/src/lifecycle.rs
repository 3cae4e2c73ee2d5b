//! Version-chain features attached to each revision.
//!
//! Revisions are immutable. Everything that depends on the *other* versions
//! of the same entity (first, latest, what happens next) is computed after
//! loading and carried alongside the revision in an [`EnrichedRevision`].

use chrono::TimeDelta;

use crate::{entity::EntityKey, revision::Revision};

/// How the next version of an entity relates to this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRevision {
  /// This is the latest version.
  None,
  /// The next version was made by the same contributor.
  SameContributor(TimeDelta),
  /// The next version was made by another contributor.
  OtherContributor(TimeDelta),
}

/// A revision bundled with the features of its version chain.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRevision {
  pub revision:          Revision,
  pub is_first_version:  bool,
  pub is_latest_version: bool,
  /// The highest version number of this entity.
  pub latest_version:    u32,
  /// Visibility of the latest version, i.e. whether the entity still exists.
  pub survives:          bool,
  pub next:              NextRevision,
}

impl EnrichedRevision {
  pub fn key(&self) -> EntityKey { self.revision.key() }

  /// The next version exists and was made by someone else.
  pub fn will_be_corrected(&self) -> bool {
    matches!(self.next, NextRevision::OtherContributor(_))
  }

  /// The next version exists and was made by the same contributor.
  pub fn will_be_self_corrected(&self) -> bool {
    matches!(self.next, NextRevision::SameContributor(_))
  }

  /// Gap to the next version; `None` on the latest version.
  pub fn time_to_next_revision(&self) -> Option<TimeDelta> {
    match self.next {
      NextRevision::None => None,
      NextRevision::SameContributor(gap) | NextRevision::OtherContributor(gap) => {
        Some(gap)
      }
    }
  }

  pub fn time_to_correction(&self) -> Option<TimeDelta> {
    match self.next {
      NextRevision::OtherContributor(gap) => Some(gap),
      _ => None,
    }
  }

  pub fn time_to_self_correction(&self) -> Option<TimeDelta> {
    match self.next {
      NextRevision::SameContributor(gap) => Some(gap),
      _ => None,
    }
  }
}
