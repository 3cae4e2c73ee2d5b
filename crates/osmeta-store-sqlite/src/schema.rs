//! SQL schema for the export catalogue. Frame tables themselves are created
//! on demand from their columns.

/// Catalogue DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per exported frame. Re-exporting a frame replaces its row.
CREATE TABLE IF NOT EXISTS exports (
    name         TEXT PRIMARY KEY,
    columns_json TEXT NOT NULL,   -- JSON array of {name, type}
    row_count    INTEGER NOT NULL,
    written_at   TEXT NOT NULL    -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
