//! Per-contributor metrics: one row per contributor id.
//!
//! Besides activity and changeset habits, a contributor row breaks their
//! modifications down by what happened to them afterwards:
//!
//! - creations (`cr`) that are still the latest version (`utd`), were
//!   modified since (`mod`) or whose entity was deleted since (`del`);
//! - deletions (`del`) that still stand (`utd`) or were undone (`rebirth`);
//! - ordinary edits (`imp`), split like creations.
//!
//! The distinct-entity sets pair each outcome with its "wrong" counterpart:
//! a creation whose entity no longer exists, a deletion that was undone.

use chrono::{DateTime, TimeDelta, Utc};
use osmeta_core::{entity::ContributorId, lifecycle::EnrichedRevision};

use crate::{
  aggregate::{
    KindCounts, MetricRow, MetricTable, Stats, TimeUnit, count_by_kind, count_unique,
    count_unique_by_kind, distribution_stats, init_from_timestamps, tally_per_entity,
  },
  changeset::ChangesetTable,
  frame::{RowWriter, ToRow},
};

/// Modification counts by kind, split by outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifications {
  pub all:         KindCounts,
  pub cr:          KindCounts,
  pub cr_utd:      KindCounts,
  pub cr_mod:      KindCounts,
  pub cr_del:      KindCounts,
  pub del:         KindCounts,
  pub del_utd:     KindCounts,
  pub del_rebirth: KindCounts,
  /// Version numbers of the deleting revisions.
  pub del_version: Option<Stats>,
  pub imp:         KindCounts,
  pub imp_utd:     KindCounts,
  pub imp_mod:     KindCounts,
  pub imp_del:     KindCounts,
  /// Version numbers of the editing revisions.
  pub imp_version: Option<Stats>,
}

/// Distinct entities in one outcome class, with the latest version numbers
/// those entities reached.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntityOutcome {
  pub count:   KindCounts,
  pub version: Option<Stats>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TouchedEntities {
  pub all:       EntityOutcome,
  pub cr:        EntityOutcome,
  pub cr_wrong:  EntityOutcome,
  pub imp:       EntityOutcome,
  pub imp_wrong: EntityOutcome,
  pub del:       EntityOutcome,
  pub del_wrong: EntityOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMetrics {
  pub uid:               ContributorId,
  pub first_at:          DateTime<Utc>,
  pub last_at:           DateTime<Utc>,
  pub activity_days:     f64,
  pub n_chgset:          u64,
  pub between_chgsets_h: Option<Stats>,
  pub chgset_duration_m: Option<Stats>,
  pub modif_per_chgset:  Option<Stats>,
  pub elem_per_chgset:   Option<Stats>,
  /// Whole hours until the next version, over all revisions.
  pub update_h:          Option<Stats>,
  pub corr_h:            Option<Stats>,
  pub corr:              KindCounts,
  pub autocorr_h:        Option<Stats>,
  pub autocorr:          KindCounts,
  pub modif:             Modifications,
  /// Revisions per touched entity.
  pub modif_per_entity:  Option<Stats>,
  /// Entities this contributor revised exactly once.
  pub single_revision:   KindCounts,
  pub entities:          TouchedEntities,
}

pub type UserTable = MetricTable<ContributorId, UserMetrics>;

impl MetricRow for UserMetrics {
  type Key = ContributorId;

  fn blank(key: &ContributorId) -> Self {
    Self {
      uid: *key,
      ..Self::default()
    }
  }
}

impl ToRow for UserMetrics {
  fn write(&self, out: &mut RowWriter) {
    let m = &self.modif;
    out
      .cell("uid", self.uid)
      .cell("first_at", self.first_at)
      .cell("last_at", self.last_at)
      .cell("activity_d", self.activity_days)
      .cell("n_chgset", self.n_chgset)
      .stats("t", "_between_chgsets_h", &self.between_chgsets_h)
      .stats("d", "_chgset_m", &self.chgset_duration_m)
      .stats("n", "_modif_bychgset", &self.modif_per_chgset)
      .stats("n", "_elem_bychgset", &self.elem_per_chgset)
      .stats("t", "_update_h", &self.update_h)
      .stats("t", "_corr_h", &self.corr_h)
      .counts("_corr", &self.corr)
      .stats("t", "_autocorr_h", &self.autocorr_h)
      .counts("_autocorr", &self.autocorr)
      .counts("_modif", &m.all)
      .counts("_modif_cr", &m.cr)
      .counts("_modif_crutd", &m.cr_utd)
      .counts("_modif_crmod", &m.cr_mod)
      .counts("_modif_crdel", &m.cr_del)
      .counts("_modif_del", &m.del)
      .counts("_modif_delutd", &m.del_utd)
      .counts("_modif_delrebirth", &m.del_rebirth)
      .stats("v", "_modif_del", &m.del_version)
      .counts("_modif_imp", &m.imp)
      .counts("_modif_imputd", &m.imp_utd)
      .counts("_modif_impmod", &m.imp_mod)
      .counts("_modif_impdel", &m.imp_del)
      .stats("v", "_modif_imp", &m.imp_version)
      .stats("n", "_modif_byelem", &self.modif_per_entity)
      .counts("_with_1_contrib", &self.single_revision);

    let e = &self.entities;
    for (suffix, outcome) in [
      ("", &e.all),
      ("_cr", &e.cr),
      ("_cr_wrong", &e.cr_wrong),
      ("_imp", &e.imp),
      ("_imp_wrong", &e.imp_wrong),
      ("_del", &e.del),
      ("_del_wrong", &e.del_wrong),
    ] {
      out
        .counts(suffix, &outcome.count)
        .stats("v", suffix, &outcome.version);
    }
  }
}

fn uid(r: &&EnrichedRevision) -> ContributorId { r.revision.contributor_id }

fn whole_hours(delta: TimeDelta) -> f64 { delta.num_hours() as f64 }

/// Filters over enriched revisions, named after their column suffixes.
mod class {
  use osmeta_core::lifecycle::EnrichedRevision as E;

  pub fn cr(r: &&E) -> bool { r.is_first_version }
  pub fn cr_utd(r: &&E) -> bool { cr(r) && r.is_latest_version }
  pub fn cr_mod(r: &&E) -> bool { cr(r) && !r.is_latest_version && r.survives }
  pub fn cr_del(r: &&E) -> bool { cr(r) && !r.is_latest_version && !r.survives }
  pub fn del(r: &&E) -> bool { !r.is_first_version && !r.revision.visible }
  pub fn del_utd(r: &&E) -> bool { del(r) && !r.survives }
  pub fn del_rebirth(r: &&E) -> bool { del(r) && r.survives }
  pub fn imp(r: &&E) -> bool { !r.is_first_version && r.revision.visible }
  pub fn imp_utd(r: &&E) -> bool { imp(r) && r.is_latest_version }
  pub fn imp_mod(r: &&E) -> bool { imp(r) && !r.is_latest_version && r.survives }
  pub fn imp_del(r: &&E) -> bool { imp(r) && !r.is_latest_version && !r.survives }

  pub fn elem_cr(r: &&E) -> bool { cr(r) && r.survives }
  pub fn elem_cr_wrong(r: &&E) -> bool { cr(r) && !r.survives }
  pub fn elem_imp(r: &&E) -> bool { imp(r) && r.survives }
  pub fn elem_imp_wrong(r: &&E) -> bool { imp(r) && !r.survives }
  pub fn elem_del(r: &&E) -> bool { del(r) && !r.survives }
  pub fn elem_del_wrong(r: &&E) -> bool { del(r) && r.survives }
}

type Filter = fn(&&EnrichedRevision) -> bool;

pub fn build(history: &[EnrichedRevision], changesets: &ChangesetTable) -> UserTable {
  let spans = init_from_timestamps(history, uid);
  let mut table = MetricTable::seed(spans, |key, span| UserMetrics {
    uid: *key,
    first_at: span.first_at,
    last_at: span.last_at,
    activity_days: span.duration(TimeUnit::Day),
    ..UserMetrics::default()
  })
  .join(
    count_unique(history, uid, |r| r.revision.changeset_id),
    |row, n| row.n_chgset = n,
  );

  // Changeset habits.
  table = table
    .join_optional(
      distribution_stats(changesets.rows(), |c| c.uid, |c| c.since_previous_h),
      |row, s| row.between_chgsets_h = s,
    )
    .join_optional(
      distribution_stats(changesets.rows(), |c| c.uid, |c| Some(c.duration_minutes)),
      |row, s| row.chgset_duration_m = s,
    )
    .join_optional(
      distribution_stats(changesets.rows(), |c| c.uid, |c| Some(c.modif.elem as f64)),
      |row, s| row.modif_per_chgset = s,
    )
    .join_optional(
      distribution_stats(changesets.rows(), |c| c.uid, |c| Some(c.elem.elem as f64)),
      |row, s| row.elem_per_chgset = s,
    );

  // Follow-ups.
  let corrected = || history.iter().filter(|r| r.will_be_corrected());
  let self_corrected = || history.iter().filter(|r| r.will_be_self_corrected());
  table = table
    .join_optional(
      distribution_stats(history, uid, |r| r.time_to_next_revision().map(whole_hours)),
      |row, s| row.update_h = s,
    )
    .join_optional(
      distribution_stats(corrected(), uid, |r| r.time_to_correction().map(whole_hours)),
      |row, s| row.corr_h = s,
    )
    .join(count_by_kind(corrected(), uid), |row, n| row.corr = n)
    .join_optional(
      distribution_stats(self_corrected(), uid, |r| {
        r.time_to_self_correction().map(whole_hours)
      }),
      |row, s| row.autocorr_h = s,
    )
    .join(count_by_kind(self_corrected(), uid), |row, n| row.autocorr = n);

  // Modifications by outcome.
  let modif_counts: [(Filter, fn(&mut Modifications) -> &mut KindCounts); 11] = [
    (class::cr, |m| &mut m.cr),
    (class::cr_utd, |m| &mut m.cr_utd),
    (class::cr_mod, |m| &mut m.cr_mod),
    (class::cr_del, |m| &mut m.cr_del),
    (class::del, |m| &mut m.del),
    (class::del_utd, |m| &mut m.del_utd),
    (class::del_rebirth, |m| &mut m.del_rebirth),
    (class::imp, |m| &mut m.imp),
    (class::imp_utd, |m| &mut m.imp_utd),
    (class::imp_mod, |m| &mut m.imp_mod),
    (class::imp_del, |m| &mut m.imp_del),
  ];
  table = table.join(count_by_kind(history, uid), |row, n| row.modif.all = n);
  for (filter, field) in modif_counts {
    table = table.join(count_by_kind(history.iter().filter(filter), uid), |row, n| {
      *field(&mut row.modif) = n;
    });
  }
  table = table
    .join_optional(
      distribution_stats(history.iter().filter(class::del), uid, |r| {
        Some(f64::from(r.revision.version))
      }),
      |row, s| row.modif.del_version = s,
    )
    .join_optional(
      distribution_stats(history.iter().filter(class::imp), uid, |r| {
        Some(f64::from(r.revision.version))
      }),
      |row, s| row.modif.imp_version = s,
    );

  // Revisions per touched entity.
  let per_entity = tally_per_entity(history, |r| r.revision.contributor_id);
  table = table
    .join_optional(
      distribution_stats(&per_entity, |t| t.group, |t| Some(t.revisions as f64)),
      |row, s| row.modif_per_entity = s,
    )
    .join(
      count_by_kind(per_entity.iter().filter(|t| t.revisions == 1), |t| t.group),
      |row, n| row.single_revision = n,
    );

  // Distinct entities by outcome.
  let entity_sets: [(Filter, fn(&mut TouchedEntities) -> &mut EntityOutcome); 7] = [
    (|_| true, |e| &mut e.all),
    (class::elem_cr, |e| &mut e.cr),
    (class::elem_cr_wrong, |e| &mut e.cr_wrong),
    (class::elem_imp, |e| &mut e.imp),
    (class::elem_imp_wrong, |e| &mut e.imp_wrong),
    (class::elem_del, |e| &mut e.del),
    (class::elem_del_wrong, |e| &mut e.del_wrong),
  ];
  for (filter, field) in entity_sets {
    table = table
      .join(
        count_unique_by_kind(history.iter().filter(filter), uid, |r| r.revision.id),
        |row, n| field(&mut row.entities).count = n,
      )
      .join_optional(
        distribution_stats(history.iter().filter(filter), uid, |r| {
          Some(f64::from(r.latest_version))
        }),
        |row, s| field(&mut row.entities).version = s,
      );
  }

  table
}
