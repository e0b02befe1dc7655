//! Database schema definitions.

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Full DDL for the minion record database.
pub const CREATE_SCHEMA: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- One row per scalar in an owner's record tree.
-- `value` has no declared type so integers, reals and text keep their type.
CREATE TABLE IF NOT EXISTS records (
    owner TEXT NOT NULL,
    path  TEXT NOT NULL,
    value,
    PRIMARY KEY (owner, path)
);

CREATE INDEX IF NOT EXISTS idx_records_owner ON records(owner);
"#;
