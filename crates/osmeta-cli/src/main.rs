//! `osmeta`: metadata metrics over OpenStreetMap history dumps.
//!
//! Reads `osmeta.toml` (or the path given with `--config`) and `OSMETA_*`
//! environment variables; flags override both.
//!
//! ```text
//! osmeta metrics bordeaux.osh --dataset bordeaux
//! osmeta chronology bordeaux.osh --start 2008-01-01 --end 2016-12-31
//! osmeta convert bordeaux.osh bordeaux.jsonl
//! osmeta select bordeaux.jsonl --table user --pattern '_corr'
//! ```

use std::{io, path::PathBuf};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use osmeta_cli::Settings;
use osmeta_metrics::TableName;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "osmeta", author, version, about = "Metadata metrics over OSM history dumps")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "osmeta.toml")]
  config: PathBuf,

  /// Directory for the SQLite database and JSON Lines tables.
  #[arg(long, global = true)]
  output_dir: Option<PathBuf>,

  /// Base name of the output files.
  #[arg(long, global = true)]
  dataset: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Compute entity, changeset and contributor metrics.
  Metrics { input: PathBuf },

  /// Print entity, contributor and changeset counts at every month end.
  Chronology {
    input: PathBuf,
    #[arg(long)]
    start: Option<NaiveDate>,
    #[arg(long)]
    end:   Option<NaiveDate>,
  },

  /// Print how often each tag key is used.
  Tags { input: PathBuf },

  /// Convert an XML history into the JSON Lines cache format.
  Convert { input: PathBuf, output: PathBuf },

  /// Print the columns of one metrics table whose names match a pattern.
  Select {
    input:   PathBuf,
    #[arg(long, value_enum)]
    table:   Table,
    /// Regular expression matched anywhere in the column name.
    #[arg(long)]
    pattern: String,
    /// Remove the matching columns instead of keeping them.
    #[arg(long)]
    drop:    bool,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum Table {
  Elem,
  Chgset,
  User,
}

impl From<Table> for TableName {
  fn from(table: Table) -> Self {
    match table {
      Table::Elem => Self::Elem,
      Table::Chgset => Self::Chgset,
      Table::User => Self::User,
    }
  }
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load {}", cli.config.display()))?;
  if let Some(dir) = cli.output_dir {
    settings.output_dir = dir;
  }
  if let Some(dataset) = cli.dataset {
    settings.dataset = dataset;
  }

  match cli.command {
    Command::Metrics { input } => {
      let output = osmeta_cli::metrics(&settings, &input)?;
      for (table, rows) in output.tables {
        println!("{:<8} {rows} rows", table.as_str());
      }
      println!("written to {}", output.database.display());
    }
    Command::Chronology { input, start, end } => {
      osmeta_cli::chronology(
        &input,
        start.unwrap_or(settings.chronology_start),
        end.unwrap_or_else(|| settings.chronology_end_or_today()),
        io::stdout().lock(),
      )?;
    }
    Command::Tags { input } => {
      osmeta_cli::tags(&input, io::stdout().lock())?;
    }
    Command::Convert { input, output } => {
      let written = osmeta_cli::convert(&input, &output)?;
      println!("{written} records written to {}", output.display());
    }
    Command::Select {
      input,
      table,
      pattern,
      drop,
    } => {
      osmeta_cli::select(&input, table.into(), &pattern, drop, io::stdout().lock())?;
    }
  }

  Ok(())
}
