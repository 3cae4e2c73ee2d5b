//! Per-entity metrics: one row per `(kind, id)`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use osmeta_core::{entity::EntityKey, lifecycle::EnrichedRevision};

use crate::{
  aggregate::{
    Lifespan, MetricRow, MetricTable, TimeUnit, count, count_unique, init_from_timestamps,
  },
  frame::{RowWriter, ToRow},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMetrics {
  pub key:            EntityKey,
  pub first_at:       DateTime<Utc>,
  pub last_at:        DateTime<Utc>,
  /// Days between first and last revision.
  pub lifecycle_days: f64,
  /// Latest version number.
  pub version:        u32,
  /// Visibility of the latest version.
  pub visible:        bool,
  pub n_chgset:       u64,
  pub n_user:         u64,
  /// Revisions followed by one from the same contributor.
  pub n_autocorr:     u64,
  /// Revisions followed by one from another contributor.
  pub n_corr:         u64,
}

pub type EntityTable = MetricTable<EntityKey, EntityMetrics>;

impl MetricRow for EntityMetrics {
  type Key = EntityKey;

  fn blank(key: &EntityKey) -> Self {
    Self {
      key: *key,
      ..Self::default()
    }
  }
}

impl ToRow for EntityMetrics {
  fn write(&self, out: &mut RowWriter) {
    out
      .entity(&self.key)
      .cell("first_at", self.first_at)
      .cell("last_at", self.last_at)
      .cell("lifecycle_d", self.lifecycle_days)
      .cell("version", self.version)
      .cell("visible", self.visible)
      .cell("n_chgset", self.n_chgset)
      .cell("n_user", self.n_user)
      .cell("n_autocorr", self.n_autocorr)
      .cell("n_corr", self.n_corr);
  }
}

pub fn build(history: &[EnrichedRevision]) -> EntityTable {
  let spans = init_from_timestamps(history, |r| r.key());
  let latest: BTreeMap<_, _> = history
    .iter()
    .filter(|r| r.is_latest_version)
    .map(|r| (r.key(), (r.revision.version, r.revision.visible)))
    .collect();

  MetricTable::seed(spans, |key, span: &Lifespan| EntityMetrics {
    key: *key,
    first_at: span.first_at,
    last_at: span.last_at,
    lifecycle_days: span.duration(TimeUnit::Day),
    ..EntityMetrics::default()
  })
  .join(latest, |row, (version, visible)| {
    row.version = version;
    row.visible = visible;
  })
  .join(
    count_unique(history, |r| r.key(), |r| r.revision.changeset_id),
    |row, n| row.n_chgset = n,
  )
  .join(
    count_unique(history, |r| r.key(), |r| r.revision.contributor_id),
    |row, n| row.n_user = n,
  )
  .join(
    count(history.iter().filter(|r| r.will_be_self_corrected()), |r| r.key()),
    |row, n| row.n_autocorr = n,
  )
  .join(
    count(history.iter().filter(|r| r.will_be_corrected()), |r| r.key()),
    |row, n| row.n_corr = n,
  )
}
