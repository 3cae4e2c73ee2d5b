//! Column-oriented export view of a metrics table.
//!
//! Metric rows are strongly typed; exporters and column selection work on a
//! [`Frame`]: an ordered list of column names and rows of [`Cell`]s. Counts
//! render as integers, absent statistics as nulls.

use std::io::Write;

use chrono::{DateTime, Utc};
use osmeta_core::entity::{EntityKey, EntityKind};
use serde_json::{Map, Value};

use crate::{
  Result,
  aggregate::{KindCounts, MetricRow, MetricTable, Stats},
};

// ─── Cell ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String),
  Time(DateTime<Utc>),
}

impl Cell {
  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Int(v) => Some(*v),
      _ => None,
    }
  }

  /// Integers widen to floats.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Float(v) => Some(*v),
      Self::Int(v) => Some(*v as f64),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Text(v) => Some(v),
      _ => None,
    }
  }

  pub fn to_json(&self) -> Value {
    match self {
      Self::Null => Value::Null,
      Self::Bool(v) => Value::Bool(*v),
      Self::Int(v) => Value::from(*v),
      Self::Float(v) => Value::from(*v),
      Self::Text(v) => Value::String(v.clone()),
      Self::Time(v) => Value::String(v.to_rfc3339()),
    }
  }
}

impl From<bool> for Cell {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<i64> for Cell {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<u32> for Cell {
  fn from(v: u32) -> Self { Self::Int(i64::from(v)) }
}

impl From<u64> for Cell {
  fn from(v: u64) -> Self { Self::Int(i64::try_from(v).unwrap_or(i64::MAX)) }
}

impl From<f64> for Cell {
  fn from(v: f64) -> Self { Self::Float(v) }
}

impl From<Option<f64>> for Cell {
  fn from(v: Option<f64>) -> Self { v.map_or(Self::Null, Self::Float) }
}

impl From<&str> for Cell {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for Cell {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<EntityKind> for Cell {
  fn from(v: EntityKind) -> Self { Self::Text(v.as_str().to_owned()) }
}

impl From<DateTime<Utc>> for Cell {
  fn from(v: DateTime<Utc>) -> Self { Self::Time(v) }
}

// ─── Row writing ─────────────────────────────────────────────────────────────

/// Collects the named cells of one row.
#[derive(Debug, Default)]
pub struct RowWriter {
  names: Vec<String>,
  cells: Vec<Cell>,
}

impl RowWriter {
  pub fn cell(&mut self, name: impl Into<String>, value: impl Into<Cell>) -> &mut Self {
    self.names.push(name.into());
    self.cells.push(value.into());
    self
  }

  /// `n_elem<suffix>`, `n_node<suffix>`, `n_way<suffix>`,
  /// `n_relation<suffix>`.
  pub fn counts(&mut self, suffix: &str, counts: &KindCounts) -> &mut Self {
    self
      .cell(format!("n_elem{suffix}"), counts.elem)
      .cell(format!("n_node{suffix}"), counts.node)
      .cell(format!("n_way{suffix}"), counts.way)
      .cell(format!("n_relation{suffix}"), counts.relation)
  }

  /// `<prefix>min<suffix>`, `<prefix>med<suffix>`, `<prefix>max<suffix>`,
  /// null when the sample was empty.
  pub fn stats(&mut self, prefix: &str, suffix: &str, stats: &Option<Stats>) -> &mut Self {
    self
      .cell(format!("{prefix}min{suffix}"), stats.map(|s| s.min))
      .cell(format!("{prefix}med{suffix}"), stats.map(|s| s.med))
      .cell(format!("{prefix}max{suffix}"), stats.map(|s| s.max))
  }

  /// `elem` and `id` columns.
  pub fn entity(&mut self, key: &EntityKey) -> &mut Self {
    self.cell("elem", key.kind).cell("id", key.id)
  }
}

/// Rows that can be written as named cells. Every row of a type must write
/// the same columns in the same order.
pub trait ToRow {
  fn write(&self, out: &mut RowWriter);
}

// ─── Frame ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
  columns: Vec<String>,
  rows:    Vec<Vec<Cell>>,
}

impl Frame {
  pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self { Self { columns, rows } }

  /// Columns are taken from the first row. An empty input gives a frame
  /// with no columns.
  pub fn from_rows<'a, R, I>(rows: I) -> Self
  where
    R: ToRow + 'a,
    I: IntoIterator<Item = &'a R>,
  {
    let mut frame = Self::default();
    for row in rows {
      let mut out = RowWriter::default();
      row.write(&mut out);
      if frame.columns.is_empty() {
        frame.columns = out.names;
      }
      frame.rows.push(out.cells);
    }
    frame
  }

  /// Export a metrics table. The header is always present, even with no
  /// rows.
  pub fn from_table<K, R>(table: &MetricTable<K, R>) -> Self
  where
    K: Ord + Default,
    R: ToRow + MetricRow<Key = K>,
  {
    let mut header = RowWriter::default();
    R::blank(&K::default()).write(&mut header);
    let mut frame = Self::from_rows(table.rows());
    frame.columns = header.names;
    frame
  }

  pub fn columns(&self) -> &[String] { &self.columns }

  pub fn rows(&self) -> &[Vec<Cell>] { &self.rows }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
    let index = self.column_index(name)?;
    Some(self.rows.iter().map(|row| &row[index]).collect())
  }

  pub fn value(&self, row: usize, name: &str) -> Option<&Cell> {
    let index = self.column_index(name)?;
    self.rows.get(row)?.get(index)
  }

  /// A new frame holding only the columns for which `keep` holds, in their
  /// original order. All rows are kept.
  pub fn retain_columns<F>(&self, keep: F) -> Self
  where
    F: Fn(&str) -> bool,
  {
    let indices: Vec<usize> = self
      .columns
      .iter()
      .enumerate()
      .filter(|(_, name)| keep(name))
      .map(|(i, _)| i)
      .collect();
    Self {
      columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
      rows:    self
        .rows
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect(),
    }
  }

  /// One JSON object per row, keyed by column name.
  pub fn to_records(&self) -> Vec<Map<String, Value>> {
    self
      .rows
      .iter()
      .map(|row| {
        self
          .columns
          .iter()
          .cloned()
          .zip(row.iter().map(Cell::to_json))
          .collect()
      })
      .collect()
  }

  /// Write one JSON object per line. Returns the number of rows written.
  pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<usize> {
    for record in self.to_records() {
      serde_json::to_writer(&mut writer, &record)?;
      writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(self.rows.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Sample {
    name:   &'static str,
    counts: KindCounts,
    stats:  Option<Stats>,
  }

  impl ToRow for Sample {
    fn write(&self, out: &mut RowWriter) {
      out
        .cell("name", self.name)
        .counts("_cr", &self.counts)
        .stats("v", "_cr", &self.stats);
    }
  }

  fn frame() -> Frame {
    Frame::from_rows(&[
      Sample {
        name:   "a",
        counts: KindCounts {
          elem:     3,
          node:     2,
          way:      1,
          relation: 0,
        },
        stats:  Stats::from_samples(vec![1.0, 2.0]),
      },
      Sample {
        name:   "b",
        counts: KindCounts::default(),
        stats:  None,
      },
    ])
  }

  #[test]
  fn column_naming() {
    let f = frame();
    assert_eq!(f.columns(), [
      "name",
      "n_elem_cr",
      "n_node_cr",
      "n_way_cr",
      "n_relation_cr",
      "vmin_cr",
      "vmed_cr",
      "vmax_cr"
    ]);
    assert_eq!(f.value(0, "vmed_cr"), Some(&Cell::Float(1.5)));
    assert_eq!(f.value(1, "n_elem_cr"), Some(&Cell::Int(0)));
    assert!(f.value(1, "vmin_cr").unwrap().is_null());
  }

  #[test]
  fn retain_keeps_order_and_rows() {
    let f = frame().retain_columns(|c| c.starts_with("n_") || c == "name");
    assert_eq!(f.columns().len(), 5);
    assert_eq!(f.columns()[0], "name");
    assert_eq!(f.len(), 2);
  }

  #[test]
  fn records_render_nulls() {
    let records = frame().to_records();
    assert_eq!(records[0]["name"], "a");
    assert_eq!(records[0]["n_node_cr"], 2);
    assert_eq!(records[1]["vmax_cr"], Value::Null);
  }

  #[test]
  fn jsonl_writes_one_line_per_row() {
    let mut out = Vec::new();
    assert_eq!(frame().write_jsonl(&mut out).unwrap(), 2);
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.starts_with(r#"{"name":"a""#), "{text}");
  }
}
