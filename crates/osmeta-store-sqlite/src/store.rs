//! [`SqliteSink`] writes metrics frames into a SQLite database.

use std::path::Path;

use chrono::Utc;
use osmeta_metrics::Frame;
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter};

use crate::{
  Result,
  encode::{ColumnSpec, ColumnType, check_table_name, decode_cell, encode_cell, encode_dt, quote},
  schema::SCHEMA,
};

/// A SQLite database holding one table per exported frame.
pub struct SqliteSink {
  conn: Connection,
}

impl SqliteSink {
  /// Open (or create) a database at `path` and initialise the catalogue.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path)?;
    Self::init(conn)
  }

  /// Open an in-memory database, for tests.
  pub fn open_in_memory() -> Result<Self> { Self::init(Connection::open_in_memory()?) }

  fn init(conn: Connection) -> Result<Self> {
    conn.execute_batch(SCHEMA)?;
    Ok(Self { conn })
  }

  /// Replace table `name` with the contents of `frame`. Returns the number
  /// of rows written.
  ///
  /// A frame without columns is recorded in the catalogue only.
  pub fn write_frame(&mut self, name: &str, frame: &Frame) -> Result<usize> {
    check_table_name(name)?;

    let specs: Vec<ColumnSpec> = frame
      .columns()
      .iter()
      .enumerate()
      .map(|(i, column)| ColumnSpec {
        name: column.clone(),
        ty:   ColumnType::infer(frame.rows().iter().map(|row| &row[i])),
      })
      .collect();

    let tx = self.conn.transaction()?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote(name)))?;

    if !specs.is_empty() {
      let definitions: Vec<String> = specs
        .iter()
        .map(|s| format!("{} {}", quote(&s.name), s.ty.sql()))
        .collect();
      tx.execute_batch(&format!(
        "CREATE TABLE {} ({});",
        quote(name),
        definitions.join(", ")
      ))?;

      let names: Vec<String> = specs.iter().map(|s| quote(&s.name)).collect();
      let slots: Vec<String> = (1..=specs.len()).map(|i| format!("?{i}")).collect();
      let mut insert = tx.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(name),
        names.join(", "),
        slots.join(", ")
      ))?;
      for row in frame.rows() {
        insert.execute(params_from_iter(row.iter().map(encode_cell)))?;
      }
    }

    tx.execute(
      "INSERT OR REPLACE INTO exports (name, columns_json, row_count, written_at)
       VALUES (?1, ?2, ?3, ?4)",
      params![
        name,
        serde_json::to_string(&specs)?,
        frame.len() as i64,
        encode_dt(Utc::now())
      ],
    )?;
    tx.commit()?;

    tracing::debug!(table = name, rows = frame.len(), columns = specs.len(), "frame written");
    Ok(frame.len())
  }

  /// Read back table `name`, or `None` if it was never exported.
  pub fn read_frame(&self, name: &str) -> Result<Option<Frame>> {
    check_table_name(name)?;

    let columns_json: Option<String> = self
      .conn
      .query_row(
        "SELECT columns_json FROM exports WHERE name = ?1",
        params![name],
        |r| r.get(0),
      )
      .optional()?;
    let Some(columns_json) = columns_json else {
      return Ok(None);
    };
    let specs: Vec<ColumnSpec> = serde_json::from_str(&columns_json)?;
    if specs.is_empty() {
      return Ok(Some(Frame::default()));
    }

    let names: Vec<String> = specs.iter().map(|s| quote(&s.name)).collect();
    let mut stmt = self.conn.prepare(&format!(
      "SELECT {} FROM {} ORDER BY rowid",
      names.join(", "),
      quote(name)
    ))?;
    let mut rows = stmt.query([])?;
    let mut cells = Vec::new();
    while let Some(row) = rows.next()? {
      let decoded = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| decode_cell(spec, row.get_ref(i)?))
        .collect::<Result<Vec<_>>>()?;
      cells.push(decoded);
    }

    let columns = specs.into_iter().map(|s| s.name).collect();
    Ok(Some(Frame::new(columns, cells)))
  }

  /// Names of all exported frames, sorted.
  pub fn exports(&self) -> Result<Vec<String>> {
    let mut stmt = self.conn.prepare("SELECT name FROM exports ORDER BY name")?;
    let names = stmt
      .query_map([], |r| r.get(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
  }
}
