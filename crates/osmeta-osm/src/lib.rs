//! Revision sources for osmeta.
//!
//! Two readers implement [`osmeta_core::source::RevisionSource`]:
//!
//! - [`XmlHistory`]: OSM XML history documents (`.osh`, `.osm`).
//! - [`JsonLinesHistory`]: the JSON Lines cache written by [`write_jsonl`].
//!
//! # Quick start
//!
//! ```no_run
//! use osmeta_core::source::RevisionSource;
//! use osmeta_osm::XmlHistory;
//!
//! let log = XmlHistory::open("bordeaux.osh").unwrap().load().unwrap();
//! println!("{} revisions", log.len());
//! ```

pub mod error;
mod jsonl;
mod xml;

pub use error::{Error, Result};
pub use jsonl::{JsonLinesHistory, write_jsonl};
pub use xml::XmlHistory;
