//! End-to-end tests of the metrics pipeline on hand-built histories.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use osmeta_core::{
  entity::{EntityKey, EntityKind},
  log::RevisionLog,
  revision::{Location, Member, NewRevision, Payload},
};
use proptest::prelude::*;

use crate::{
  Cell, TableName, aggregate::KindCounts, enrich, frame::Frame, run, select_matching,
};

fn t(hours: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2013, 5, 1, 0, 0, 0).unwrap() + TimeDelta::hours(hours)
}

fn here() -> Payload { Payload::Node(Some(Location::new(45.0, 5.0))) }

fn node(id: i64, version: u32, hours: i64, uid: i64, chgset: i64) -> NewRevision {
  NewRevision::new(id, version, t(hours), uid, chgset, here())
}

fn deleted_node(id: i64, version: u32, hours: i64, uid: i64, chgset: i64) -> NewRevision {
  NewRevision::new(id, version, t(hours), uid, chgset, Payload::Node(None))
}

fn way(id: i64, version: u32, hours: i64, uid: i64, chgset: i64, refs: Vec<i64>) -> NewRevision {
  NewRevision::new(id, version, t(hours), uid, chgset, Payload::Way(refs))
}

fn log(records: Vec<NewRevision>) -> RevisionLog {
  RevisionLog::from_new(records).expect("valid fixture")
}

fn int(frame: &Frame, row: usize, column: &str) -> i64 {
  frame
    .value(row, column)
    .and_then(Cell::as_i64)
    .unwrap_or_else(|| panic!("no integer in {column}"))
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn node_corrected_by_another_contributor() {
  let history = log(vec![node(1, 1, 0, 1, 10), node(1, 2, 36, 2, 11)]);
  let report = run(&history);

  assert_eq!(report.entities.len(), 1);
  let row = report
    .entities
    .get(&EntityKey::new(EntityKind::Node, 1))
    .unwrap();
  assert_eq!(row.lifecycle_days, 1.5);
  assert_eq!(row.version, 2);
  assert!(row.visible);
  assert_eq!(row.n_chgset, 2);
  assert_eq!(row.n_user, 2);
  assert_eq!(row.n_corr, 1);
  assert_eq!(row.n_autocorr, 0);

  let enriched = enrich(&history);
  assert!(enriched[0].will_be_corrected());
  assert_eq!(enriched[0].time_to_correction(), Some(TimeDelta::hours(36)));
}

#[test]
fn deleted_way_does_not_survive() {
  let history = log(vec![
    way(3, 1, 0, 1, 10, vec![1, 2]),
    way(3, 2, 4, 1, 11, vec![1, 2, 4]),
    way(3, 3, 9, 2, 12, vec![]),
  ]);
  let enriched = enrich(&history);
  assert!(enriched.iter().all(|r| !r.survives));

  let report = run(&history);
  let row = report
    .entities
    .get(&EntityKey::new(EntityKind::Way, 3))
    .unwrap();
  assert!(!row.visible);
  assert_eq!(row.n_autocorr, 1);
  assert_eq!(row.n_corr, 1);
}

#[test]
fn changeset_of_three_creations() {
  let history = log(vec![node(1, 1, 0, 5, 99), node(2, 1, 0, 5, 99), node(3, 1, 1, 5, 99)]);
  let report = run(&history);
  let frame = report.frame(TableName::Chgset);

  assert_eq!(frame.len(), 1);
  assert_eq!(int(&frame, 0, "chgset"), 99);
  assert_eq!(int(&frame, 0, "uid"), 5);
  assert_eq!(int(&frame, 0, "n_node_modif_cr"), 3);
  assert_eq!(int(&frame, 0, "n_node_modif_del"), 0);
  assert_eq!(int(&frame, 0, "n_node_modif_imp"), 0);
  assert_eq!(int(&frame, 0, "n_elem_modif"), 3);
  assert_eq!(int(&frame, 0, "n_node_cr"), 3);
  assert_eq!(frame.value(0, "duration_m"), Some(&Cell::Float(60.0)));
  assert!(frame.value(0, "user_lastchgset_h").unwrap().is_null());
}

#[test]
fn single_revision_contributor_has_no_correction_statistics() {
  let history = log(vec![node(1, 1, 0, 9, 40)]);
  let report = run(&history);
  let user = report.users.get(&9).unwrap();

  assert_eq!(user.single_revision.elem, 1);
  assert!(user.corr_h.is_none());
  assert!(user.autocorr_h.is_none());
  assert!(user.update_h.is_none());
  assert_eq!(user.corr, KindCounts::default());

  let frame = report.frame(TableName::User);
  assert_eq!(int(&frame, 0, "n_elem_with_1_contrib"), 1);
  assert!(frame.value(0, "tmed_corr_h").unwrap().is_null());
  assert_eq!(int(&frame, 0, "n_node_corr"), 0);
}

#[test]
fn missing_deletions_are_zero() {
  let history = log(vec![node(1, 1, 0, 1, 10), node(1, 2, 3, 1, 10)]);
  let frame = run(&history).frame(TableName::User);
  for column in frame.columns().iter().filter(|c| c.contains("_del")) {
    if column.starts_with("n_") {
      assert_eq!(int(&frame, 0, column), 0, "{column}");
    }
  }
}

// ─── Contributor breakdown ───────────────────────────────────────────────────

/// Contributor 1 creates nodes 1 and 2; contributor 2 edits node 1;
/// contributor 1 then deletes it.
fn contested() -> RevisionLog {
  log(vec![
    node(1, 1, 0, 1, 1),
    node(2, 1, 1, 1, 1),
    node(1, 2, 5, 2, 2),
    deleted_node(1, 3, 30, 1, 3),
  ])
}

#[test]
fn contributor_modifications_by_outcome() {
  let report = run(&contested());
  let a = report.users.get(&1).unwrap();

  assert_eq!(a.n_chgset, 2);
  assert_eq!(a.modif.all.node, 3);
  assert_eq!(a.modif.cr.node, 2);
  assert_eq!(a.modif.cr_utd.node, 1);
  assert_eq!(a.modif.cr_mod.node, 0);
  assert_eq!(a.modif.cr_del.node, 1);
  assert_eq!(a.modif.del.node, 1);
  assert_eq!(a.modif.del_utd.node, 1);
  assert_eq!(a.modif.del_rebirth.node, 0);
  assert_eq!(a.modif.del_version.map(|s| s.med), Some(3.0));
  assert_eq!(a.modif.imp.elem, 0);
  assert!(a.modif.imp_version.is_none());

  let b = report.users.get(&2).unwrap();
  assert_eq!(b.modif.imp.node, 1);
  assert_eq!(b.modif.imp_del.node, 1);
  assert_eq!(b.modif.imp_version.map(|s| s.max), Some(2.0));
}

#[test]
fn contributor_follow_ups() {
  let report = run(&contested());
  let a = report.users.get(&1).unwrap();
  assert_eq!(a.corr.node, 1);
  assert_eq!(a.corr_h.map(|s| s.med), Some(5.0));
  assert!(a.autocorr_h.is_none());
  assert_eq!(a.update_h.map(|s| (s.min, s.max)), Some((5.0, 5.0)));

  let b = report.users.get(&2).unwrap();
  assert_eq!(b.corr_h.map(|s| s.min), Some(25.0));
}

#[test]
fn contributor_entity_outcomes() {
  let report = run(&contested());
  let a = report.users.get(&1).unwrap();

  let per_entity = a.modif_per_entity.unwrap();
  assert_eq!((per_entity.min, per_entity.med, per_entity.max), (1.0, 1.5, 2.0));
  assert_eq!(a.single_revision.node, 1);

  let e = &a.entities;
  assert_eq!(e.all.count.node, 2);
  assert_eq!(e.cr.count.node, 1);
  assert_eq!(e.cr.version.map(|s| s.max), Some(1.0));
  assert_eq!(e.cr_wrong.count.node, 1);
  assert_eq!(e.cr_wrong.version.map(|s| s.max), Some(3.0));
  assert_eq!(e.del.count.node, 1);
  assert_eq!(e.del_wrong.count.elem, 0);
  assert!(e.del_wrong.version.is_none());

  let b = report.users.get(&2).unwrap();
  assert_eq!(b.entities.imp_wrong.count.node, 1);
  assert_eq!(b.entities.imp.count.elem, 0);
}

#[test]
fn changeset_gaps_per_contributor() {
  let report = run(&contested());
  assert!(report.changesets.get(&1).unwrap().since_previous_h.is_none());
  assert_eq!(report.changesets.get(&3).unwrap().since_previous_h, Some(30.0));
  assert_eq!(report.changesets.get(&1).unwrap().duration_minutes, 60.0);
  assert_eq!(report.changesets.get(&3).unwrap().elem_del.node, 1);
  assert_eq!(report.changesets.get(&1).unwrap().elem_cr.node, 1);
  assert_eq!(report.changesets.get(&2).unwrap().elem_imp.elem, 0);

  let a = report.users.get(&1).unwrap();
  assert_eq!(a.between_chgsets_h.map(|s| s.med), Some(30.0));
  assert_eq!(a.elem_per_chgset.map(|s| (s.min, s.max)), Some((1.0, 2.0)));
  assert!(report.users.get(&2).unwrap().between_chgsets_h.is_none());
}

#[test]
fn shared_changeset_goes_to_earliest_contributor() {
  let history = log(vec![node(1, 1, 2, 8, 50), node(2, 1, 1, 7, 50)]);
  let report = run(&history);
  assert_eq!(report.changesets.get(&50).unwrap().uid, 7);
}

// ─── Revived entity ──────────────────────────────────────────────────────────

/// Contributor 1 creates node 1 and creates then twice edits node 2 in
/// changeset 10; contributor 2 edits node 1, contributor 3 deletes it and
/// contributor 1 brings it back in changeset 40.
fn revived() -> RevisionLog {
  log(vec![
    node(1, 1, 0, 1, 10),
    node(2, 1, 0, 1, 10),
    node(2, 2, 0, 1, 10),
    node(2, 3, 1, 1, 10),
    node(1, 2, 3, 2, 20),
    deleted_node(1, 3, 6, 3, 30),
    node(1, 4, 9, 1, 40),
  ])
}

fn float(frame: &Frame, row: usize, column: &str) -> f64 {
  frame
    .value(row, column)
    .and_then(Cell::as_f64)
    .unwrap_or_else(|| panic!("no number in {column}"))
}

#[test]
fn changeset_revisions_per_entity() {
  let frame = run(&revived()).frame(TableName::Chgset);
  assert_eq!(int(&frame, 0, "chgset"), 10);

  assert_eq!(float(&frame, 0, "nmin_modif_byelem"), 1.0);
  assert_eq!(float(&frame, 0, "nmed_modif_byelem"), 2.0);
  assert_eq!(float(&frame, 0, "nmax_modif_byelem"), 3.0);
  assert_eq!(int(&frame, 0, "n_node_modif"), 4);
  assert_eq!(int(&frame, 0, "n_node_modif_imp"), 2);
  assert_eq!(int(&frame, 0, "n_node_cr"), 2);
  assert_eq!(int(&frame, 0, "n_node_imp"), 1);
}

#[test]
fn revived_entity_outcomes_per_contributor() {
  let frame = run(&revived()).frame(TableName::User);
  assert_eq!(int(&frame, 0, "uid"), 1);
  assert_eq!(int(&frame, 2, "uid"), 3);

  // Contributor 1: both creations were modified later, and two of three
  // edits are still current.
  assert_eq!(int(&frame, 0, "n_node_modif_crmod"), 2);
  assert_eq!(int(&frame, 0, "n_node_modif_imp"), 3);
  assert_eq!(int(&frame, 0, "n_node_modif_imputd"), 2);
  assert_eq!(int(&frame, 0, "n_node_modif_impmod"), 1);
  assert_eq!(int(&frame, 0, "n_node_imp"), 2);
  assert_eq!(
    ["dmin_chgset_m", "dmed_chgset_m", "dmax_chgset_m"].map(|c| float(&frame, 0, c)),
    [0.0, 30.0, 60.0]
  );
  assert_eq!(
    ["nmin_modif_bychgset", "nmed_modif_bychgset", "nmax_modif_bychgset"]
      .map(|c| float(&frame, 0, c)),
    [1.0, 2.5, 4.0]
  );

  // Contributor 3: the deletion was undone.
  assert_eq!(int(&frame, 2, "n_node_modif_del"), 1);
  assert_eq!(int(&frame, 2, "n_node_modif_delrebirth"), 1);
  assert_eq!(int(&frame, 2, "n_node_modif_delutd"), 0);
  assert_eq!(int(&frame, 2, "n_node_del_wrong"), 1);
  assert_eq!(float(&frame, 2, "vmax_del_wrong"), 4.0);
  assert_eq!(int(&frame, 2, "n_elem_del"), 0);
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[test]
fn frames_have_unique_columns() {
  let report = run(&contested());
  for (name, frame) in report.frames() {
    let unique: BTreeSet<&String> = frame.columns().iter().collect();
    assert_eq!(unique.len(), frame.columns().len(), "{}", name.as_str());
    assert!(frame.rows().iter().all(|r| r.len() == frame.columns().len()));
  }
}

#[test]
fn empty_log_gives_empty_tables_with_headers() {
  let report = run(&RevisionLog::default());
  let frame = report.frame(TableName::User);
  assert!(frame.is_empty());
  assert_eq!(frame.columns()[0], "uid");
  assert!(frame.column_index("tmed_update_h").is_some());
}

#[test]
fn selection_on_metrics() {
  let frame = run(&contested()).frame(TableName::User);
  let corrections = select_matching(&frame, "corr").unwrap();
  assert!(!corrections.columns().is_empty());
  assert!(corrections.columns().iter().all(|c| c.contains("corr")));
  assert_eq!(corrections.len(), frame.len());
}

// ─── Properties ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Step {
  uid:     i64,
  chgset:  i64,
  gap_min: i64,
  deleted: bool,
}

fn arb_step() -> impl Strategy<Value = Step> {
  (1i64..4, 1i64..6, 0i64..5_000, any::<bool>()).prop_map(|(uid, chgset, gap_min, deleted)| {
    Step {
      uid,
      chgset,
      gap_min,
      deleted,
    }
  })
}

fn payload(kind: u8, deleted: bool) -> Payload {
  match (kind, deleted) {
    (0, true) => Payload::Node(None),
    (0, false) => here(),
    (1, true) => Payload::Way(vec![]),
    (1, false) => Payload::Way(vec![1, 2]),
    (_, true) => Payload::Relation(vec![]),
    (_, false) => Payload::Relation(vec![Member {
      ref_id:   1,
      role:     "inner".into(),
      ref_type: EntityKind::Way,
    }]),
  }
}

fn arb_log() -> impl Strategy<Value = RevisionLog> {
  prop::collection::vec((0u8..3, prop::collection::vec(arb_step(), 1..5)), 0..10).prop_map(
    |chains| {
      let mut records = Vec::new();
      for (index, (kind, steps)) in chains.into_iter().enumerate() {
        let mut minutes = 0;
        for (version, step) in steps.into_iter().enumerate() {
          minutes += step.gap_min;
          records.push(NewRevision::new(
            index as i64 + 1,
            version as u32 + 1,
            t(0) + TimeDelta::minutes(minutes),
            step.uid,
            step.chgset,
            payload(kind, step.deleted),
          ));
        }
      }
      log(records)
    },
  )
}

proptest! {
  #[test]
  fn one_first_and_one_latest_per_entity(history in arb_log()) {
    let enriched = enrich(&history);
    for key in history.entity_keys() {
      let chain: Vec<_> = enriched.iter().filter(|r| r.key() == key).collect();
      prop_assert_eq!(chain.iter().filter(|r| r.is_first_version).count(), 1);
      prop_assert_eq!(chain.iter().filter(|r| r.is_latest_version).count(), 1);
    }
  }

  #[test]
  fn follow_ups_are_consistent(history in arb_log()) {
    for r in enrich(&history) {
      prop_assert!(!(r.will_be_corrected() && r.will_be_self_corrected()));
      if r.is_latest_version {
        prop_assert!(!r.will_be_corrected() && !r.will_be_self_corrected());
        prop_assert!(r.time_to_next_revision().is_none());
      } else {
        let gap = r.time_to_next_revision();
        prop_assert!(gap.is_some_and(|g| g >= TimeDelta::zero()));
      }
    }
  }

  #[test]
  fn one_row_per_key(history in arb_log()) {
    let report = run(&history);
    let changesets: BTreeSet<_> = history.iter().map(|r| r.changeset_id).collect();
    let users: BTreeSet<_> = history.iter().map(|r| r.contributor_id).collect();
    prop_assert_eq!(report.entities.len(), history.entity_keys().len());
    prop_assert_eq!(report.changesets.len(), changesets.len());
    prop_assert_eq!(report.users.len(), users.len());
  }

  #[test]
  fn pipeline_is_idempotent(history in arb_log()) {
    prop_assert_eq!(run(&history), run(&history));
  }
}
