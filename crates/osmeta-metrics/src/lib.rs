//! Metrics over an OSM history: per entity, per changeset and per
//! contributor.
//!
//! The pipeline is a chain of pure functions over a loaded
//! [`RevisionLog`]:
//!
//! 1. [`enrich`] attaches version-chain features to every revision.
//! 2. The table builders ([`entity::build`], [`changeset::build`],
//!    [`user::build`]) seed one row per key and fold in columns computed by
//!    the [`aggregate`] primitives.
//! 3. [`Frame`] turns a typed table into named columns for export and
//!    column selection.
//!
//! [`run`] does all of it.

pub mod aggregate;
pub mod changeset;
pub mod chronology;
pub mod enrich;
pub mod entity;
pub mod error;
pub mod frame;
pub mod select;
pub mod tags;
pub mod user;

#[cfg(test)]
mod tests;

pub use chronology::{chronology, latest, snapshot, stats};
pub use enrich::enrich;
pub use error::{Error, Result};
pub use frame::{Cell, Frame};
pub use select::{drop_matching, select_matching};
pub use tags::tag_key_inventory;

use osmeta_core::log::RevisionLog;

use crate::{changeset::ChangesetTable, entity::EntityTable, user::UserTable};

/// The three metrics tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
  pub entities:   EntityTable,
  pub changesets: ChangesetTable,
  pub users:      UserTable,
}

/// Names under which the tables are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableName {
  Elem,
  Chgset,
  User,
}

impl TableName {
  pub const ALL: [Self; 3] = [Self::Elem, Self::Chgset, Self::User];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Elem => "elem",
      Self::Chgset => "chgset",
      Self::User => "user",
    }
  }
}

impl MetricsReport {
  pub fn frame(&self, table: TableName) -> Frame {
    match table {
      TableName::Elem => Frame::from_table(&self.entities),
      TableName::Chgset => Frame::from_table(&self.changesets),
      TableName::User => Frame::from_table(&self.users),
    }
  }

  pub fn frames(&self) -> Vec<(TableName, Frame)> {
    TableName::ALL.iter().map(|&t| (t, self.frame(t))).collect()
  }
}

/// Enrich the log and build every metrics table.
pub fn run(log: &RevisionLog) -> MetricsReport {
  let span = tracing::info_span!("metrics", revisions = log.len());
  let _guard = span.enter();

  let history = enrich(log);

  let entities = entity::build(&history);
  tracing::info!(rows = entities.len(), "entity metrics");

  let changesets = changeset::build(&history);
  tracing::info!(rows = changesets.len(), "changeset metrics");

  let users = user::build(&history, &changesets);
  tracing::info!(rows = users.len(), "user metrics");

  MetricsReport {
    entities,
    changesets,
    users,
  }
}
