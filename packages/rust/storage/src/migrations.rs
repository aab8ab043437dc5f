//! SQL migration definitions for the household registry database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: households, contacts",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Registered households, one per primary display name
CREATE TABLE IF NOT EXISTS households (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    name_key      TEXT NOT NULL UNIQUE,
    contact_id    TEXT,
    record_json   TEXT NOT NULL,
    registered_at TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Contact records; the sequence doubles as the contact id
CREATE TABLE IF NOT EXISTS contacts (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    household_name TEXT NOT NULL,
    record_json    TEXT NOT NULL,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contacts_household ON contacts(household_name);

-- Start contact numbering at 1000
INSERT INTO sqlite_sequence (name, seq) VALUES ('contacts', 999);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
