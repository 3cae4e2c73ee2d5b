//! Per-changeset metrics: one row per changeset id.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use osmeta_core::{
  entity::{ChangesetId, ContributorId},
  lifecycle::EnrichedRevision,
};

use crate::{
  aggregate::{
    KindCounts, MetricRow, MetricTable, Stats, TimeUnit, count_by_kind, count_unique,
    count_unique_by_kind, distribution_stats, init_from_timestamps, tally_per_entity,
  },
  frame::{RowWriter, ToRow},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangesetMetrics {
  pub chgset:            ChangesetId,
  pub first_at:          DateTime<Utc>,
  pub last_at:           DateTime<Utc>,
  pub duration_minutes:  f64,
  /// Contributor of the changeset's earliest revision.
  pub uid:               ContributorId,
  /// Hours since the contributor's previous changeset opened; `None` for
  /// their first one.
  pub since_previous_h:  Option<f64>,
  pub modif:             KindCounts,
  pub modif_cr:          KindCounts,
  pub modif_del:         KindCounts,
  pub modif_imp:         KindCounts,
  /// Revisions per touched entity.
  pub modif_per_entity:  Option<Stats>,
  /// Distinct entities touched.
  pub elem:              KindCounts,
  /// Distinct entities created here that still exist.
  pub elem_cr:           KindCounts,
  /// Distinct entities improved here that still exist.
  pub elem_imp:          KindCounts,
  /// Distinct entities deleted here that are still deleted.
  pub elem_del:          KindCounts,
}

pub type ChangesetTable = MetricTable<ChangesetId, ChangesetMetrics>;

impl MetricRow for ChangesetMetrics {
  type Key = ChangesetId;

  fn blank(key: &ChangesetId) -> Self {
    Self {
      chgset: *key,
      ..Self::default()
    }
  }
}

impl ToRow for ChangesetMetrics {
  fn write(&self, out: &mut RowWriter) {
    out
      .cell("chgset", self.chgset)
      .cell("first_at", self.first_at)
      .cell("last_at", self.last_at)
      .cell("duration_m", self.duration_minutes)
      .cell("uid", self.uid)
      .cell("user_lastchgset_h", self.since_previous_h)
      .counts("_modif", &self.modif)
      .counts("_modif_cr", &self.modif_cr)
      .counts("_modif_del", &self.modif_del)
      .counts("_modif_imp", &self.modif_imp)
      .stats("n", "_modif_byelem", &self.modif_per_entity)
      .counts("", &self.elem)
      .counts("_cr", &self.elem_cr)
      .counts("_imp", &self.elem_imp)
      .counts("_del", &self.elem_del);
  }
}

fn chgset(r: &&EnrichedRevision) -> ChangesetId { r.revision.changeset_id }

fn is_creation(r: &&EnrichedRevision) -> bool { r.is_first_version }

fn is_improvement(r: &&EnrichedRevision) -> bool { !r.is_first_version && r.revision.visible }

fn is_deletion(r: &&EnrichedRevision) -> bool { !r.is_first_version && !r.revision.visible }

pub fn build(history: &[EnrichedRevision]) -> ChangesetTable {
  let spans = init_from_timestamps(history, chgset);

  let mut owners: BTreeMap<ChangesetId, (DateTime<Utc>, ContributorId)> = BTreeMap::new();
  for r in history {
    let candidate = (r.revision.timestamp, r.revision.contributor_id);
    owners
      .entry(r.revision.changeset_id)
      .and_modify(|owner| *owner = (*owner).min(candidate))
      .or_insert(candidate);
  }
  let shared = count_unique(history, chgset, |r| r.revision.contributor_id)
    .values()
    .filter(|&&n| n > 1)
    .count();
  if shared > 0 {
    tracing::warn!(
      changesets = shared,
      "changesets with several contributors; attributed to the earliest"
    );
  }

  let per_entity = tally_per_entity(history, |r| r.revision.changeset_id);

  let table = MetricTable::seed(spans, |key, span| ChangesetMetrics {
    chgset: *key,
    first_at: span.first_at,
    last_at: span.last_at,
    duration_minutes: span.duration(TimeUnit::Minute),
    ..ChangesetMetrics::default()
  })
  .join(
    owners.into_iter().map(|(k, (_, uid))| (k, uid)).collect(),
    |row, uid| row.uid = uid,
  )
  .join(count_by_kind(history, chgset), |row, n| row.modif = n)
  .join(
    count_by_kind(history.iter().filter(is_creation), chgset),
    |row, n| row.modif_cr = n,
  )
  .join(
    count_by_kind(history.iter().filter(is_deletion), chgset),
    |row, n| row.modif_del = n,
  )
  .join(
    count_by_kind(history.iter().filter(is_improvement), chgset),
    |row, n| row.modif_imp = n,
  )
  .join_optional(
    distribution_stats(&per_entity, |t| t.group, |t| Some(t.revisions as f64)),
    |row, s| row.modif_per_entity = s,
  )
  .join(
    count_unique_by_kind(history, chgset, |r| r.revision.id),
    |row, n| row.elem = n,
  )
  .join(
    count_unique_by_kind(
      history.iter().filter(|r| is_creation(r) && r.survives),
      chgset,
      |r| r.revision.id,
    ),
    |row, n| row.elem_cr = n,
  )
  .join(
    count_unique_by_kind(
      history.iter().filter(|r| is_improvement(r) && r.survives),
      chgset,
      |r| r.revision.id,
    ),
    |row, n| row.elem_imp = n,
  )
  .join(
    count_unique_by_kind(
      history.iter().filter(|r| is_deletion(r) && !r.survives),
      chgset,
      |r| r.revision.id,
    ),
    |row, n| row.elem_del = n,
  );

  let gaps = gaps_since_previous(&table);
  table.join_optional(gaps, |row, gap| row.since_previous_h = gap)
}

/// For each changeset, the hours since its contributor's previous changeset
/// opened. Changesets of one contributor are ordered by opening time.
fn gaps_since_previous(table: &ChangesetTable) -> BTreeMap<ChangesetId, f64> {
  let mut opened: BTreeMap<ContributorId, Vec<(DateTime<Utc>, ChangesetId)>> = BTreeMap::new();
  for row in table.rows() {
    opened.entry(row.uid).or_default().push((row.first_at, row.chgset));
  }

  let mut gaps = BTreeMap::new();
  for mut sequence in opened.into_values() {
    sequence.sort();
    for pair in sequence.windows(2) {
      let gap = TimeUnit::Hour.convert(pair[1].0 - pair[0].0);
      gaps.insert(pair[1].1, gap);
    }
  }
  gaps
}
