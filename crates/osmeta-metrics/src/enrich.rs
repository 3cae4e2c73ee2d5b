//! Attach version-chain features to every revision of a log.

use std::collections::BTreeMap;

use osmeta_core::{
  entity::EntityKey,
  lifecycle::{EnrichedRevision, NextRevision},
  log::RevisionLog,
  revision::Revision,
};

/// Enrich every revision with its first/latest flags, the survival of its
/// entity and how its successor relates to it.
///
/// Revisions are grouped per entity and ordered by version. When a chain has
/// gaps (a version missing from the log) the "next" revision is simply the
/// next one present.
pub fn enrich(log: &RevisionLog) -> Vec<EnrichedRevision> {
  let mut chains: BTreeMap<EntityKey, Vec<&Revision>> = BTreeMap::new();
  for revision in log {
    chains.entry(revision.key()).or_default().push(revision);
  }

  let mut enriched = Vec::with_capacity(log.len());
  let mut gapped = 0usize;

  for (_, mut chain) in chains {
    chain.sort_by_key(|r| r.version);
    let Some(latest) = chain.last().copied() else {
      continue;
    };
    if !is_contiguous(&chain) {
      gapped += 1;
    }

    let successors = chain.iter().skip(1).map(Some).chain(std::iter::once(None));
    for (position, (current, successor)) in chain.iter().zip(successors).enumerate() {
      let next = match successor {
        None => NextRevision::None,
        Some(next) => {
          let gap = next.timestamp - current.timestamp;
          if next.contributor_id == current.contributor_id {
            NextRevision::SameContributor(gap)
          } else {
            NextRevision::OtherContributor(gap)
          }
        }
      };
      enriched.push(EnrichedRevision {
        revision: (*current).clone(),
        is_first_version: position == 0,
        is_latest_version: successor.is_none(),
        latest_version: latest.version,
        survives: latest.visible,
        next,
      });
    }
  }

  if gapped > 0 {
    tracing::warn!(
      entities = gapped,
      "version chains with gaps; successors are taken from the versions present"
    );
  }
  tracing::debug!(revisions = enriched.len(), "enriched history");
  enriched
}

fn is_contiguous(chain: &[&Revision]) -> bool {
  chain.first().is_some_and(|r| r.version == 1)
    && chain.windows(2).all(|w| w[1].version == w[0].version + 1)
}
