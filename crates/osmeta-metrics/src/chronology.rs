//! Point-in-time views of the history and their evolution month by month.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use osmeta_core::{entity::EntityKind, log::RevisionLog, revision::Revision};

use crate::frame::{RowWriter, ToRow};

/// The state of every entity as of a cutoff: its highest version at or
/// before the cutoff. Entities with no such version are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<'a> {
  /// `None` for the up-to-date state.
  pub as_of: Option<DateTime<Utc>>,
  revisions: Vec<&'a Revision>,
}

impl<'a> Snapshot<'a> {
  pub fn revisions(&self) -> &[&'a Revision] { &self.revisions }

  pub fn len(&self) -> usize { self.revisions.len() }

  pub fn is_empty(&self) -> bool { self.revisions.is_empty() }
}

pub fn snapshot(history: &RevisionLog, date: DateTime<Utc>) -> Snapshot<'_> {
  let revisions = history
    .entities()
    .filter_map(|chain| {
      chain
        .iter()
        .filter(|r| r.timestamp <= date)
        .max_by_key(|r| r.version)
    })
    .collect();
  Snapshot {
    as_of: Some(date),
    revisions,
  }
}

/// The latest version of every entity.
pub fn latest(history: &RevisionLog) -> Snapshot<'_> {
  let revisions = history
    .entities()
    .filter_map(|chain| chain.iter().max_by_key(|r| r.version))
    .collect();
  Snapshot {
    as_of: None,
    revisions,
  }
}

/// Entity, contributor and changeset counts of a snapshot. Deleted entities
/// are counted under their kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationStats {
  pub n_nodes:     u64,
  pub n_ways:      u64,
  pub n_relations: u64,
  pub n_users:     u64,
  pub n_chgsets:   u64,
}

pub fn stats(snapshot: &Snapshot<'_>) -> PopulationStats {
  let mut out = PopulationStats::default();
  let mut users = BTreeSet::new();
  let mut chgsets = BTreeSet::new();
  for r in snapshot.revisions() {
    match r.kind {
      EntityKind::Node => out.n_nodes += 1,
      EntityKind::Way => out.n_ways += 1,
      EntityKind::Relation => out.n_relations += 1,
    }
    users.insert(r.contributor_id);
    chgsets.insert(r.changeset_id);
  }
  out.n_users = users.len() as u64;
  out.n_chgsets = chgsets.len() as u64;
  out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChronologyRow {
  pub date:  NaiveDate,
  pub stats: PopulationStats,
}

impl ToRow for ChronologyRow {
  fn write(&self, out: &mut RowWriter) {
    out
      .cell("date", self.date.to_string())
      .cell("n_nodes", self.stats.n_nodes)
      .cell("n_ways", self.stats.n_ways)
      .cell("n_relations", self.stats.n_relations)
      .cell("n_users", self.stats.n_users)
      .cell("n_chgsets", self.stats.n_chgsets);
  }
}

/// Last calendar day of every month, restricted to `start..=end`.
pub fn month_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
  let mut out = Vec::new();
  let Some(mut month) = start.with_day(1) else {
    return out;
  };
  while month <= end {
    let Some(next) = month.checked_add_months(Months::new(1)) else {
      break;
    };
    if let Some(last) = next.pred_opt()
      && last >= start
      && last <= end
    {
      out.push(last);
    }
    month = next;
  }
  out
}

/// Population statistics at every month end between `start` and `end`,
/// each taken at 00:00 UTC.
pub fn chronology(history: &RevisionLog, start: NaiveDate, end: NaiveDate) -> Vec<ChronologyRow> {
  let rows: Vec<_> = month_ends(start, end)
    .into_iter()
    .map(|date| {
      let cutoff = date.and_time(NaiveTime::MIN).and_utc();
      ChronologyRow {
        date,
        stats: stats(&snapshot(history, cutoff)),
      }
    })
    .collect();
  tracing::debug!(points = rows.len(), %start, %end, "chronology");
  rows
}
