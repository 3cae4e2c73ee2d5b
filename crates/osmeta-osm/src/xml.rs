//! OSM XML history reader.
//!
//! Pipeline:
//!   BufRead
//!     └─ quick-xml events
//!          └─ Pending (one open <node>/<way>/<relation>)
//!               └─ <tag>/<nd>/<member> children accumulate
//!                    └─ end of element → NewRevision
//!
//! Only the attributes the analysis needs are read. Any `visible` attribute
//! is ignored; visibility is recomputed from the payload on validation.

use std::{fmt::Display, fs::File, io::BufRead, io::BufReader, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use osmeta_core::{
  entity::{EntityId, EntityKind},
  log::RevisionLog,
  revision::{Location, Member, NewRevision, Payload, Revision},
  source::RevisionSource,
};
use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};

use crate::error::{Error, Result};

// ─── Attribute access ────────────────────────────────────────────────────────

struct Attrs {
  element: &'static str,
  offset:  u64,
  values:  Vec<(Vec<u8>, String)>,
}

impl Attrs {
  fn read(e: &BytesStart<'_>, element: &'static str, offset: u64) -> Result<Self> {
    let mut values = Vec::new();
    for attr in e.attributes() {
      let attr = attr.map_err(|err| Error::Xml {
        offset,
        message: err.to_string(),
      })?;
      let value = attr
        .unescape_value()
        .map_err(|err| Error::Xml {
          offset,
          message: err.to_string(),
        })?
        .into_owned();
      values.push((attr.key.as_ref().to_vec(), value));
    }
    Ok(Self {
      element,
      offset,
      values,
    })
  }

  fn get(&self, name: &str) -> Option<&str> {
    self
      .values
      .iter()
      .find(|(k, _)| k.as_slice() == name.as_bytes())
      .map(|(_, v)| v.as_str())
  }

  fn optional<T>(&self, name: &'static str) -> Result<Option<T>>
  where
    T: FromStr,
    T::Err: Display,
  {
    self
      .get(name)
      .map(|raw| {
        raw.parse::<T>().map_err(|err| Error::InvalidAttribute {
          element:   self.element,
          attribute: name,
          value:     raw.to_string(),
          reason:    err.to_string(),
          offset:    self.offset,
        })
      })
      .transpose()
  }

  fn required<T>(&self, name: &'static str) -> Result<T>
  where
    T: FromStr,
    T::Err: Display,
  {
    self.optional(name)?.ok_or(Error::MissingAttribute {
      element:   self.element,
      attribute: name,
      offset:    self.offset,
    })
  }
}

// ─── Open element ────────────────────────────────────────────────────────────

struct Pending {
  offset:    u64,
  kind:      EntityKind,
  id:        EntityId,
  version:   u32,
  timestamp: DateTime<Utc>,
  uid:       i64,
  changeset: i64,
  location:  Option<Location>,
  tag_keys:  Vec<String>,
  nodes:     Vec<EntityId>,
  members:   Vec<Member>,
}

impl Pending {
  fn open(attrs: &Attrs, kind: EntityKind) -> Result<Self> {
    let location = if kind == EntityKind::Node {
      match (attrs.optional::<f64>("lat")?, attrs.optional::<f64>("lon")?) {
        (Some(lat), Some(lon)) => Some(Location::new(lat, lon)),
        _ => None,
      }
    } else {
      None
    };

    Ok(Self {
      offset: attrs.offset,
      kind,
      id: attrs.required("id")?,
      version: attrs.required("version")?,
      timestamp: attrs.required("timestamp")?,
      // Anonymous edits from the early years carry no uid.
      uid: attrs.optional("uid")?.unwrap_or(0),
      changeset: attrs.required("changeset")?,
      location,
      tag_keys: Vec::new(),
      nodes: Vec::new(),
      members: Vec::new(),
    })
  }

  fn finish(self) -> (u64, NewRevision) {
    let payload = match self.kind {
      EntityKind::Node => Payload::Node(self.location.filter(Location::is_valid)),
      EntityKind::Way => Payload::Way(self.nodes),
      EntityKind::Relation => Payload::Relation(self.members),
    };
    let record = NewRevision::new(
      self.id,
      self.version,
      self.timestamp,
      self.uid,
      self.changeset,
      payload,
    )
    .with_tags(self.tag_keys);
    (self.offset, record)
  }
}

fn entity_kind(name: &[u8]) -> Option<EntityKind> {
  match name {
    b"node" => Some(EntityKind::Node),
    b"way" => Some(EntityKind::Way),
    b"relation" => Some(EntityKind::Relation),
    _ => None,
  }
}

// ─── Reader ──────────────────────────────────────────────────────────────────

/// Streams [`NewRevision`]s out of an OSM XML history document.
pub struct XmlHistory<R> {
  reader:  Reader<R>,
  buf:     Vec<u8>,
  current: Option<Pending>,
  done:    bool,
}

impl XmlHistory<BufReader<File>> {
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let file = File::open(path)?;
    Ok(Self::new(BufReader::new(file)))
  }
}

impl<R: BufRead> XmlHistory<R> {
  pub fn new(input: R) -> Self {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);
    Self {
      reader,
      buf: Vec::new(),
      current: None,
      done: false,
    }
  }

  /// Read up to the end of the next entity element. Returns the byte offset
  /// at which the element started together with the record.
  pub fn next_record(&mut self) -> Result<Option<(u64, NewRevision)>> {
    if self.done {
      return Ok(None);
    }

    loop {
      let offset = self.reader.buffer_position();
      self.buf.clear();
      let event = self
        .reader
        .read_event_into(&mut self.buf)
        .map_err(|err| Error::Xml {
          offset,
          message: err.to_string(),
        })?;

      match event {
        Event::Start(ref e) | Event::Empty(ref e) => {
          let self_closing = matches!(event, Event::Empty(_));
          let name = e.name();
          if let Some(kind) = entity_kind(name.as_ref()) {
            if let Some(open) = &self.current {
              return Err(Error::Xml {
                offset,
                message: format!("<{kind}> inside unterminated <{}>", open.kind),
              });
            }
            let attrs = Attrs::read(e, kind.as_str(), offset)?;
            let pending = Pending::open(&attrs, kind)?;
            if self_closing {
              return Ok(Some(pending.finish()));
            }
            self.current = Some(pending);
          } else if let Some(pending) = self.current.as_mut() {
            read_child(pending, e, offset)?;
          }
        }
        Event::End(ref e) => {
          if entity_kind(e.name().as_ref()).is_some()
            && let Some(pending) = self.current.take()
          {
            return Ok(Some(pending.finish()));
          }
        }
        Event::Eof => {
          self.done = true;
          if let Some(pending) = self.current.take() {
            return Err(Error::Xml {
              offset:  pending.offset,
              message: format!("unterminated <{}>", pending.kind),
            });
          }
          return Ok(None);
        }
        _ => {}
      }
    }
  }
}

/// Fold a `<tag>`, `<nd>` or `<member>` child into the open element.
fn read_child(pending: &mut Pending, e: &BytesStart<'_>, offset: u64) -> Result<()> {
  match e.name().as_ref() {
    b"tag" => {
      let attrs = Attrs::read(e, "tag", offset)?;
      pending.tag_keys.push(attrs.required("k")?);
    }
    b"nd" => {
      let attrs = Attrs::read(e, "nd", offset)?;
      pending.nodes.push(attrs.required("ref")?);
    }
    b"member" => {
      let attrs = Attrs::read(e, "member", offset)?;
      pending.members.push(Member {
        ref_id:   attrs.required("ref")?,
        role:     attrs.get("role").unwrap_or_default().to_string(),
        ref_type: attrs.required("type")?,
      });
    }
    _ => {}
  }
  Ok(())
}

impl<R: BufRead> Iterator for XmlHistory<R> {
  type Item = Result<NewRevision>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.next_record() {
      Ok(Some((_, record))) => Some(Ok(record)),
      Ok(None) => None,
      Err(err) => {
        self.done = true;
        Some(Err(err))
      }
    }
  }
}

impl<R: BufRead> RevisionSource for XmlHistory<R> {
  type Error = Error;

  fn load(mut self) -> Result<RevisionLog> {
    let mut revisions = Vec::new();
    while let Some((offset, record)) = self.next_record()? {
      let revision = Revision::try_from(record)
        .map_err(|source| Error::XmlRecord { offset, source })?;
      revisions.push(revision);
    }
    tracing::debug!(revisions = revisions.len(), "parsed xml history");
    Ok(RevisionLog::new(revisions)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const HISTORY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <node id="1" version="1" timestamp="2012-05-01T10:00:00Z" uid="7" user="a" changeset="100" lat="44.84" lon="-0.58">
    <tag k="amenity" v="bench"/>
  </node>
  <node id="1" version="2" timestamp="2013-05-01T10:00:00Z" uid="8" user="b" changeset="200" visible="false"/>
  <way id="5" version="1" timestamp="2012-05-02T10:00:00Z" uid="7" changeset="101">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="residential"/>
    <tag k="name" v="Rue &amp; Co"/>
  </way>
  <relation id="9" version="1" timestamp="2012-05-03T10:00:00Z" changeset="102">
    <member type="way" ref="5" role="outer"/>
    <member type="node" ref="1" role=""/>
  </relation>
</osm>
"#;

  fn parse(input: &str) -> Result<Vec<NewRevision>> {
    XmlHistory::new(input.as_bytes()).collect()
  }

  #[test]
  fn reads_all_entity_kinds() {
    let records = parse(HISTORY).unwrap();
    assert_eq!(records.len(), 4);

    let first = &records[0];
    assert_eq!(first.kind, EntityKind::Node);
    assert_eq!(first.tag_keys, ["amenity"]);
    assert_eq!(first.payload, Payload::Node(Some(Location::new(44.84, -0.58))));

    let way = &records[2];
    assert_eq!(way.payload, Payload::Way(vec![1, 2]));
    assert_eq!(way.tag_keys, ["highway", "name"]);

    let rel = &records[3];
    assert_eq!(rel.contributor_id, 0, "missing uid maps to anonymous");
    match &rel.payload {
      Payload::Relation(members) => {
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].ref_type, EntityKind::Way);
        assert_eq!(members[0].role, "outer");
      }
      other => panic!("unexpected payload {other:?}"),
    }
  }

  #[test]
  fn deleted_node_has_no_location() {
    let records = parse(HISTORY).unwrap();
    assert_eq!(records[1].payload, Payload::Node(None));
  }

  #[test]
  fn load_recomputes_visibility() {
    let log = XmlHistory::new(HISTORY.as_bytes()).load().unwrap();
    assert_eq!(log.len(), 4);
    let visible: Vec<_> = log.iter().map(|r| r.visible).collect();
    // node v1, node v2 (deleted), way, relation
    assert_eq!(visible, [true, false, true, true]);
  }

  #[test]
  fn missing_required_attribute_is_reported_with_offset() {
    let input = r#"<osm><node id="1" timestamp="2012-05-01T10:00:00Z" changeset="1"/></osm>"#;
    let err = parse(input).unwrap_err();
    match err {
      Error::MissingAttribute {
        attribute, offset, ..
      } => {
        assert_eq!(attribute, "version");
        assert_eq!(offset, 5);
      }
      other => panic!("unexpected error {other}"),
    }
  }

  #[test]
  fn negative_version_is_invalid() {
    let input = r#"<osm><way id="1" version="-1" timestamp="2012-05-01T10:00:00Z" changeset="1"/></osm>"#;
    let err = parse(input).unwrap_err();
    assert!(matches!(err, Error::InvalidAttribute { attribute: "version", .. }), "{err}");
  }

  #[test]
  fn version_zero_is_rejected_on_load() {
    let input = r#"<osm><way id="1" version="0" timestamp="2012-05-01T10:00:00Z" changeset="1"/></osm>"#;
    let err = XmlHistory::new(input.as_bytes()).load().unwrap_err();
    assert!(matches!(err, Error::XmlRecord { .. }), "{err}");
  }

  #[test]
  fn unterminated_element_is_an_error() {
    let input = r#"<osm><way id="1" version="1" timestamp="2012-05-01T10:00:00Z" changeset="1"><nd ref="3"/>"#;
    assert!(parse(input).is_err());
  }

  #[test]
  fn nested_entity_is_an_error() {
    let input = r#"<osm><way id="1" version="1" timestamp="2012-05-01T10:00:00Z" changeset="1"><node id="2" version="1" timestamp="2012-05-01T10:00:00Z" changeset="1"/></way></osm>"#;
    let err = parse(input).unwrap_err();
    match err {
      Error::Xml { offset, message } => {
        assert_eq!(offset, 76);
        assert!(message.contains("unterminated <way>"), "{message}");
      }
      other => panic!("unexpected error {other}"),
    }
  }

  #[test]
  fn changeset_tags_are_ignored() {
    let input = r#"<osm><changeset id="3"><tag k="comment" v="x"/></changeset></osm>"#;
    assert!(parse(input).unwrap().is_empty());
  }
}
