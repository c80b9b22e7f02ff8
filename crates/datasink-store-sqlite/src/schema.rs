//! SQL schema for a datasink SQLite database.
//!
//! Executed on every connection; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per typed measurement element. Wrappers are never stored.
CREATE TABLE IF NOT EXISTS data (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    parent           INTEGER REFERENCES data(id),  -- nearest stored ancestor
    guid             TEXT NOT NULL,                -- measurement source
    arrival          TEXT,                         -- UTC, microsecond precision
    production_start TEXT,
    production_end   TEXT,
    type             TEXT,
    value            REAL
);

CREATE INDEX IF NOT EXISTS data_parent_idx ON data(parent);
";

/// Insert one element; `?1` is the parent row id or NULL.
pub const INSERT_ROW: &str = "
INSERT INTO data (parent, guid, arrival, production_start, production_end, type, value)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
";
