//! SQLite export of metrics frames.
//!
//! Every frame becomes one table. A catalogue table records the column types
//! of each export so that frames read back with the cells they were written
//! with (booleans and timestamps included).

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteSink;
