//! Grouping and summarisation primitives shared by every metrics table.
//!
//! Each primitive reads a borrowed source and returns a fresh column keyed by
//! the grouping key. [`MetricTable::join`] folds a column into a table with
//! the outer-join-then-default policy: a table row with no match in the
//! column receives the column type's default (zero counts, absent
//! statistics), and a column key with no table row gets a blank row.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};
use osmeta_core::{
  entity::{EntityKey, EntityKind},
  lifecycle::EnrichedRevision,
  revision::Revision,
};

// ─── Record traits ───────────────────────────────────────────────────────────

/// Records that belong to an entity kind.
pub trait Kinded {
  fn kind(&self) -> EntityKind;
}

/// Records that carry a timestamp.
pub trait Timed {
  fn timestamp(&self) -> DateTime<Utc>;
}

impl<T: Kinded + ?Sized> Kinded for &T {
  fn kind(&self) -> EntityKind { (**self).kind() }
}

impl<T: Timed + ?Sized> Timed for &T {
  fn timestamp(&self) -> DateTime<Utc> { (**self).timestamp() }
}

impl Kinded for Revision {
  fn kind(&self) -> EntityKind { self.kind }
}

impl Timed for Revision {
  fn timestamp(&self) -> DateTime<Utc> { self.timestamp }
}

impl Kinded for EnrichedRevision {
  fn kind(&self) -> EntityKind { self.revision.kind }
}

impl Timed for EnrichedRevision {
  fn timestamp(&self) -> DateTime<Utc> { self.revision.timestamp }
}

// ─── Column types ────────────────────────────────────────────────────────────

/// A count broken down by entity kind, plus the overall total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
  pub elem:     u64,
  pub node:     u64,
  pub way:      u64,
  pub relation: u64,
}

impl KindCounts {
  pub fn add(&mut self, kind: EntityKind, n: u64) {
    match kind {
      EntityKind::Node => self.node += n,
      EntityKind::Way => self.way += n,
      EntityKind::Relation => self.relation += n,
    }
    self.elem += n;
  }

  pub fn get(&self, kind: EntityKind) -> u64 {
    match kind {
      EntityKind::Node => self.node,
      EntityKind::Way => self.way,
      EntityKind::Relation => self.relation,
    }
  }
}

/// Minimum, median and maximum of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
  pub min: f64,
  pub med: f64,
  pub max: f64,
}

impl Stats {
  /// `None` for an empty sample. NaN samples are ignored.
  pub fn from_samples(mut samples: Vec<f64>) -> Option<Self> {
    samples.retain(|v| !v.is_nan());
    samples.sort_by(f64::total_cmp);
    let n = samples.len();
    if n == 0 {
      return None;
    }
    let med = if n % 2 == 1 {
      samples[n / 2]
    } else {
      (samples[n / 2 - 1] + samples[n / 2]) / 2.0
    };
    Some(Self {
      min: samples[0],
      med,
      max: samples[n - 1],
    })
  }
}

/// Unit in which a duration column is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
  Second,
  Minute,
  Hour,
  Day,
}

impl TimeUnit {
  fn seconds(self) -> f64 {
    match self {
      Self::Second => 1.0,
      Self::Minute => 60.0,
      Self::Hour => 3_600.0,
      Self::Day => 86_400.0,
    }
  }

  /// Fractional number of units in `delta`.
  pub fn convert(self, delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1_000.0 / self.seconds()
  }
}

/// First and last timestamp of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifespan {
  pub first_at: DateTime<Utc>,
  pub last_at:  DateTime<Utc>,
}

impl Lifespan {
  fn at(ts: DateTime<Utc>) -> Self {
    Self {
      first_at: ts,
      last_at:  ts,
    }
  }

  fn include(&mut self, ts: DateTime<Utc>) {
    self.first_at = self.first_at.min(ts);
    self.last_at = self.last_at.max(ts);
  }

  pub fn span(&self) -> TimeDelta { self.last_at - self.first_at }

  pub fn duration(&self, unit: TimeUnit) -> f64 { unit.convert(self.span()) }
}

// ─── Primitives ──────────────────────────────────────────────────────────────

/// One lifespan per distinct key: the seed of every metrics table.
pub fn init_from_timestamps<T, K, I, F>(data: I, key: F) -> BTreeMap<K, Lifespan>
where
  T: Timed,
  K: Ord,
  I: IntoIterator<Item = T>,
  F: Fn(&T) -> K,
{
  let mut spans: BTreeMap<K, Lifespan> = BTreeMap::new();
  for record in data {
    let ts = record.timestamp();
    spans
      .entry(key(&record))
      .and_modify(|span| span.include(ts))
      .or_insert_with(|| Lifespan::at(ts));
  }
  spans
}

/// Number of records per key.
pub fn count<T, K, I, F>(data: I, key: F) -> BTreeMap<K, u64>
where
  K: Ord,
  I: IntoIterator<Item = T>,
  F: Fn(&T) -> K,
{
  let mut counts = BTreeMap::new();
  for record in data {
    *counts.entry(key(&record)).or_insert(0) += 1;
  }
  counts
}

/// Number of distinct `subject` values per key.
pub fn count_unique<T, K, S, I, F, G>(data: I, key: F, subject: G) -> BTreeMap<K, u64>
where
  K: Ord,
  S: Ord,
  I: IntoIterator<Item = T>,
  F: Fn(&T) -> K,
  G: Fn(&T) -> S,
{
  let mut sets: BTreeMap<K, BTreeSet<S>> = BTreeMap::new();
  for record in data {
    sets.entry(key(&record)).or_default().insert(subject(&record));
  }
  sets
    .into_iter()
    .map(|(k, set)| (k, set.len() as u64))
    .collect()
}

/// Number of records per key, broken down by entity kind.
pub fn count_by_kind<T, K, I, F>(data: I, key: F) -> BTreeMap<K, KindCounts>
where
  T: Kinded,
  K: Ord,
  I: IntoIterator<Item = T>,
  F: Fn(&T) -> K,
{
  let mut counts: BTreeMap<K, KindCounts> = BTreeMap::new();
  for record in data {
    counts.entry(key(&record)).or_default().add(record.kind(), 1);
  }
  counts
}

/// Number of distinct `subject` values per `(key, kind)`, with the total
/// summed over kinds.
pub fn count_unique_by_kind<T, K, S, I, F, G>(
  data: I,
  key: F,
  subject: G,
) -> BTreeMap<K, KindCounts>
where
  T: Kinded,
  K: Ord,
  S: Ord,
  I: IntoIterator<Item = T>,
  F: Fn(&T) -> K,
  G: Fn(&T) -> S,
{
  let mut sets: BTreeMap<K, [BTreeSet<S>; 3]> = BTreeMap::new();
  for record in data {
    let slot = match record.kind() {
      EntityKind::Node => 0,
      EntityKind::Way => 1,
      EntityKind::Relation => 2,
    };
    sets
      .entry(key(&record))
      .or_insert_with(|| [BTreeSet::new(), BTreeSet::new(), BTreeSet::new()])[slot]
      .insert(subject(&record));
  }
  sets
    .into_iter()
    .map(|(k, [nodes, ways, relations])| {
      let mut counts = KindCounts::default();
      counts.add(EntityKind::Node, nodes.len() as u64);
      counts.add(EntityKind::Way, ways.len() as u64);
      counts.add(EntityKind::Relation, relations.len() as u64);
      (k, counts)
    })
    .collect()
}

/// Min / median / max of `subject` per key. Null samples are skipped; a key
/// whose samples are all null gets no entry.
pub fn distribution_stats<T, K, I, F, G>(data: I, key: F, subject: G) -> BTreeMap<K, Stats>
where
  K: Ord,
  I: IntoIterator<Item = T>,
  F: Fn(&T) -> K,
  G: Fn(&T) -> Option<f64>,
{
  let mut samples: BTreeMap<K, Vec<f64>> = BTreeMap::new();
  for record in data {
    if let Some(value) = subject(&record) {
      samples.entry(key(&record)).or_default().push(value);
    }
  }
  samples
    .into_iter()
    .filter_map(|(k, values)| Stats::from_samples(values).map(|s| (k, s)))
    .collect()
}

// ─── Per-entity tallies ──────────────────────────────────────────────────────

/// How many revisions of one entity fall in one group (a changeset, a
/// contributor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTally<K> {
  pub entity:    EntityKey,
  pub group:     K,
  pub revisions: u64,
}

impl<K> Kinded for EntityTally<K> {
  fn kind(&self) -> EntityKind { self.entity.kind }
}

/// Count revisions per `(entity, group)`.
pub fn tally_per_entity<'a, K, I, F>(data: I, group: F) -> Vec<EntityTally<K>>
where
  K: Ord + Copy,
  I: IntoIterator<Item = &'a EnrichedRevision>,
  F: Fn(&EnrichedRevision) -> K,
{
  count(data, |r| (r.key(), group(*r)))
    .into_iter()
    .map(|((entity, group), revisions)| EntityTally {
      entity,
      group,
      revisions,
    })
    .collect()
}

// ─── MetricTable ─────────────────────────────────────────────────────────────

/// A row type that can stand in for a key with no data yet.
pub trait MetricRow {
  type Key;

  /// A row for `key` with every metric at its default.
  fn blank(key: &Self::Key) -> Self;
}

/// Rows of one metrics table, ordered by key.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable<K, R> {
  rows: BTreeMap<K, R>,
}

impl<K, R> MetricTable<K, R>
where
  K: Ord + Clone,
  R: MetricRow<Key = K>,
{
  /// Build one row per lifespan.
  pub fn seed<F>(spans: BTreeMap<K, Lifespan>, init: F) -> Self
  where
    F: Fn(&K, &Lifespan) -> R,
  {
    let rows = spans
      .into_iter()
      .map(|(key, span)| {
        let row = init(&key, &span);
        (key, row)
      })
      .collect();
    Self { rows }
  }

  /// Outer-join `column` into the table. Rows without a match receive
  /// `V::default()`; existing rows keep their order.
  pub fn join<V, F>(mut self, mut column: BTreeMap<K, V>, set: F) -> Self
  where
    V: Default,
    F: Fn(&mut R, V),
  {
    for (key, row) in self.rows.iter_mut() {
      set(row, column.remove(key).unwrap_or_default());
    }
    for (key, value) in column {
      let mut row = R::blank(&key);
      set(&mut row, value);
      self.rows.insert(key, row);
    }
    self
  }

  /// Like [`join`](Self::join) for columns that may be absent: rows
  /// without a match receive `None`.
  pub fn join_optional<V, F>(self, column: BTreeMap<K, V>, set: F) -> Self
  where
    F: Fn(&mut R, Option<V>),
  {
    let column = column.into_iter().map(|(k, v)| (k, Some(v))).collect();
    self.join(column, set)
  }
}

impl<K: Ord, R> MetricTable<K, R> {
  pub fn get(&self, key: &K) -> Option<&R> { self.rows.get(key) }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn keys(&self) -> impl Iterator<Item = &K> { self.rows.keys() }

  pub fn rows(&self) -> impl Iterator<Item = &R> { self.rows.values() }

  pub fn iter(&self) -> impl Iterator<Item = (&K, &R)> { self.rows.iter() }
}
