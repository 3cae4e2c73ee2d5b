//! Core types for the osmeta history analyser.
//!
//! This crate is deliberately free of I/O and logging. Revision sources,
//! metric builders and exporters all depend on it; it depends on nothing
//! beyond serialisation and time handling.

pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod log;
pub mod revision;
pub mod source;

pub use error::{Error, Result};
