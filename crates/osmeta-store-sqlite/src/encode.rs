//! Encoding and decoding between frame cells and SQLite values.
//!
//! Timestamps are stored as RFC 3339 strings, booleans as 0/1 integers. The
//! declared [`ColumnType`] of each column is what tells them apart on the
//! way back.

use chrono::{DateTime, Utc};
use osmeta_metrics::Cell;
use rusqlite::types::{Value, ValueRef};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── ColumnType ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  Integer,
  Real,
  Boolean,
  Text,
  Timestamp,
}

impl ColumnType {
  pub fn sql(self) -> &'static str {
    match self {
      Self::Integer | Self::Boolean => "INTEGER",
      Self::Real => "REAL",
      Self::Text | Self::Timestamp => "TEXT",
    }
  }

  fn name(self) -> &'static str {
    match self {
      Self::Integer => "integer",
      Self::Real => "real",
      Self::Boolean => "boolean",
      Self::Text => "text",
      Self::Timestamp => "timestamp",
    }
  }

  /// Type of the first non-null cell. All-null columns hold statistics over
  /// empty samples and are declared `REAL`.
  pub fn infer<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
    cells
      .into_iter()
      .find_map(|cell| match cell {
        Cell::Null => None,
        Cell::Bool(_) => Some(Self::Boolean),
        Cell::Int(_) => Some(Self::Integer),
        Cell::Float(_) => Some(Self::Real),
        Cell::Text(_) => Some(Self::Text),
        Cell::Time(_) => Some(Self::Timestamp),
      })
      .unwrap_or(Self::Real)
  }
}

/// A column as recorded in the export catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
  pub name: String,
  #[serde(rename = "type")]
  pub ty:   ColumnType,
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

pub fn check_table_name(name: &str) -> Result<()> {
  let valid = !name.is_empty()
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    && !name.starts_with(|c: char| c.is_ascii_digit());
  if valid {
    Ok(())
  } else {
    Err(Error::InvalidName(name.to_owned()))
  }
}

/// Double-quote an identifier for SQL.
pub fn quote(ident: &str) -> String { format!("\"{}\"", ident.replace('"', "\"\"")) }

// ─── Cells ───────────────────────────────────────────────────────────────────

pub fn encode_cell(cell: &Cell) -> Value {
  match cell {
    Cell::Null => Value::Null,
    Cell::Bool(v) => Value::Integer(i64::from(*v)),
    Cell::Int(v) => Value::Integer(*v),
    Cell::Float(v) => Value::Real(*v),
    Cell::Text(v) => Value::Text(v.clone()),
    Cell::Time(v) => Value::Text(encode_dt(*v)),
  }
}

fn found(value: ValueRef<'_>) -> &'static str {
  match value {
    ValueRef::Null => "null",
    ValueRef::Integer(_) => "integer",
    ValueRef::Real(_) => "real",
    ValueRef::Text(_) => "text",
    ValueRef::Blob(_) => "blob",
  }
}

pub fn decode_cell(column: &ColumnSpec, value: ValueRef<'_>) -> Result<Cell> {
  let mismatch = || Error::Decode {
    column:   column.name.clone(),
    expected: column.ty.name(),
    found:    found(value),
  };
  let text = |bytes: &[u8]| std::str::from_utf8(bytes).map(str::to_owned).map_err(|_| mismatch());

  Ok(match (column.ty, value) {
    (_, ValueRef::Null) => Cell::Null,
    (ColumnType::Integer, ValueRef::Integer(v)) => Cell::Int(v),
    (ColumnType::Boolean, ValueRef::Integer(v)) => Cell::Bool(v != 0),
    (ColumnType::Real, ValueRef::Real(v)) => Cell::Float(v),
    (ColumnType::Real, ValueRef::Integer(v)) => Cell::Float(v as f64),
    (ColumnType::Text, ValueRef::Text(bytes)) => Cell::Text(text(bytes)?),
    (ColumnType::Timestamp, ValueRef::Text(bytes)) => Cell::Time(decode_dt(&text(bytes)?)?),
    _ => return Err(mismatch()),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn infer_skips_nulls() {
    let cells = [Cell::Null, Cell::Float(1.0)];
    assert_eq!(ColumnType::infer(&cells), ColumnType::Real);
    assert_eq!(ColumnType::infer(&[Cell::Null]), ColumnType::Real);
    assert_eq!(ColumnType::infer(&[Cell::Bool(true)]), ColumnType::Boolean);
  }

  #[test]
  fn table_names() {
    assert!(check_table_name("user").is_ok());
    assert!(check_table_name("bordeaux_chgset").is_ok());
    assert!(check_table_name("").is_err());
    assert!(check_table_name("1user").is_err());
    assert!(check_table_name("user; DROP TABLE exports").is_err());
  }

  #[test]
  fn quoting_escapes_quotes() {
    assert_eq!(quote("n_elem"), "\"n_elem\"");
    assert_eq!(quote("a\"b"), "\"a\"\"b\"");
  }

  #[test]
  fn decode_rejects_mismatched_storage() {
    let spec = ColumnSpec {
      name: "first_at".into(),
      ty:   ColumnType::Timestamp,
    };
    let err = decode_cell(&spec, ValueRef::Integer(3)).unwrap_err();
    assert!(err.to_string().contains("first_at"), "{err}");
    assert!(decode_cell(&spec, ValueRef::Null).unwrap().is_null());
  }
}
