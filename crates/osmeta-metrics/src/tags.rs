//! How often each tag key is used, per entity kind.

use osmeta_core::{entity::EntityKind, log::RevisionLog};

use crate::{
  aggregate::{KindCounts, Kinded, count_by_kind},
  frame::{RowWriter, ToRow},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagKeyCount {
  pub key:    String,
  /// Revisions carrying the key.
  pub counts: KindCounts,
}

impl ToRow for TagKeyCount {
  fn write(&self, out: &mut RowWriter) {
    out.cell("tagkey", self.key.as_str()).counts("", &self.counts);
  }
}

struct TagUse<'a> {
  kind: EntityKind,
  key:  &'a str,
}

impl Kinded for TagUse<'_> {
  fn kind(&self) -> EntityKind { self.kind }
}

/// Tag keys sorted by total use, most used first; ties by key.
pub fn tag_key_inventory(history: &RevisionLog) -> Vec<TagKeyCount> {
  let uses = history.iter().flat_map(|r| {
    r.tag_keys.iter().map(|key| TagUse {
      kind: r.kind,
      key:  key.as_str(),
    })
  });
  let mut inventory: Vec<TagKeyCount> = count_by_kind(uses, |u| u.key)
    .into_iter()
    .map(|(key, counts)| TagKeyCount {
      key: key.to_owned(),
      counts,
    })
    .collect();
  inventory.sort_by(|a, b| b.counts.elem.cmp(&a.counts.elem).then_with(|| a.key.cmp(&b.key)));
  inventory
}
