//! Commands behind the `osmeta` binary.
//!
//! Each command loads a history (OSM XML, or the JSON Lines cache when the
//! file ends in `.jsonl`), runs the relevant part of the metrics pipeline
//! and writes its result.

use std::{
  fs::{self, File},
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use osmeta_core::{log::RevisionLog, source::RevisionSource};
use osmeta_metrics::{Frame, TableName, drop_matching, select_matching, tag_key_inventory};
use osmeta_osm::{JsonLinesHistory, XmlHistory, write_jsonl};
use osmeta_store_sqlite::SqliteSink;
use serde::Deserialize;

// ─── Settings ────────────────────────────────────────────────────────────────

/// Layered configuration: defaults, then the TOML file, then `OSMETA_*`
/// environment variables. Command-line flags are applied by the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub output_dir:       PathBuf,
  /// Base name of every output file.
  pub dataset:          String,
  pub chronology_start: NaiveDate,
  /// Last day of the chronology; today when unset.
  pub chronology_end:   Option<NaiveDate>,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      output_dir:       PathBuf::from("output"),
      dataset:          "history".to_string(),
      chronology_start: NaiveDate::from_ymd_opt(2006, 1, 1).unwrap_or_default(),
      chronology_end:   None,
    }
  }
}

impl Settings {
  /// Read `path` if it exists, then the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("OSMETA"))
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise Settings")
  }

  pub fn chronology_end_or_today(&self) -> NaiveDate {
    self
      .chronology_end
      .unwrap_or_else(|| Utc::now().date_naive())
  }

  pub fn database_path(&self) -> PathBuf {
    self.output_dir.join(format!("{}.sqlite", self.dataset))
  }

  pub fn jsonl_path(&self, table: TableName) -> PathBuf {
    self
      .output_dir
      .join(format!("{}-{}.jsonl", self.dataset, table.as_str()))
  }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

fn is_jsonl(path: &Path) -> bool { path.extension().is_some_and(|ext| ext == "jsonl") }

/// Load and validate a history file.
pub fn load_log(path: &Path) -> anyhow::Result<RevisionLog> {
  let log = if is_jsonl(path) {
    JsonLinesHistory::open(path).and_then(RevisionSource::load)
  } else {
    XmlHistory::open(path).and_then(RevisionSource::load)
  }
  .with_context(|| format!("failed to load history from {}", path.display()))?;

  tracing::info!(
    revisions = log.len(),
    entities = log.entity_keys().len(),
    "history loaded"
  );
  Ok(log)
}

// ─── Commands ────────────────────────────────────────────────────────────────

/// Where `metrics` wrote its tables.
#[derive(Debug)]
pub struct MetricsOutput {
  pub database: PathBuf,
  pub tables:   Vec<(TableName, usize)>,
}

/// Compute the three metrics tables and write them to SQLite and JSON Lines.
pub fn metrics(settings: &Settings, input: &Path) -> anyhow::Result<MetricsOutput> {
  let log = load_log(input)?;
  let report = osmeta_metrics::run(&log);

  fs::create_dir_all(&settings.output_dir)
    .with_context(|| format!("failed to create {}", settings.output_dir.display()))?;
  let database = settings.database_path();
  let mut sink = SqliteSink::open(&database)
    .with_context(|| format!("failed to open database at {}", database.display()))?;

  let mut tables = Vec::new();
  for (table, frame) in report.frames() {
    sink
      .write_frame(table.as_str(), &frame)
      .with_context(|| format!("failed to write table {}", table.as_str()))?;

    let path = settings.jsonl_path(table);
    let file = File::create(&path)
      .with_context(|| format!("failed to create {}", path.display()))?;
    frame
      .write_jsonl(BufWriter::new(file))
      .with_context(|| format!("failed to write {}", path.display()))?;

    tables.push((table, frame.len()));
  }

  tracing::info!(database = %database.display(), "metrics written");
  Ok(MetricsOutput { database, tables })
}

/// Write the monthly population series as JSON Lines.
pub fn chronology<W: Write>(
  input: &Path,
  start: NaiveDate,
  end: NaiveDate,
  out: W,
) -> anyhow::Result<usize> {
  let log = load_log(input)?;
  let rows = osmeta_metrics::chronology(&log, start, end);
  Ok(Frame::from_rows(&rows).write_jsonl(out)?)
}

/// Write the tag-key inventory as JSON Lines.
pub fn tags<W: Write>(input: &Path, out: W) -> anyhow::Result<usize> {
  let log = load_log(input)?;
  let inventory = tag_key_inventory(&log);
  Ok(Frame::from_rows(&inventory).write_jsonl(out)?)
}

/// Re-encode an XML history as the JSON Lines cache.
pub fn convert(input: &Path, output: &Path) -> anyhow::Result<usize> {
  let records = XmlHistory::open(input)
    .and_then(|history| history.collect::<osmeta_osm::Result<Vec<_>>>())
    .with_context(|| format!("failed to read {}", input.display()))?;
  let file =
    File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
  let written = write_jsonl(BufWriter::new(file), &records)
    .with_context(|| format!("failed to write {}", output.display()))?;
  tracing::info!(records = written, output = %output.display(), "history converted");
  Ok(written)
}

/// Compute one metrics table and write the columns matching (or, with
/// `drop`, not matching) `pattern` as JSON Lines.
pub fn select<W: Write>(
  input: &Path,
  table: TableName,
  pattern: &str,
  drop: bool,
  out: W,
) -> anyhow::Result<usize> {
  let log = load_log(input)?;
  let frame = osmeta_metrics::run(&log).frame(table);
  let selected = if drop {
    drop_matching(&frame, pattern)
  } else {
    select_matching(&frame, pattern)
  }
  .with_context(|| format!("bad column pattern {pattern:?}"))?;
  tracing::debug!(columns = selected.columns().len(), "columns selected");
  Ok(selected.write_jsonl(out)?)
}
