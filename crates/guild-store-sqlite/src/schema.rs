//! SQL schema for the guild events cache.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Ids come from the feed.
CREATE TABLE IF NOT EXISTS organisation (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL
);

-- Ids are local; the URL identifies an event across syncs.
CREATE TABLE IF NOT EXISTS event (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    organiser_id    INTEGER NOT NULL
                    REFERENCES organisation(id) ON DELETE CASCADE,
    organiser_name  TEXT NOT NULL,   -- copy of the feed's organiserName
    name            TEXT NOT NULL,
    from_date       TEXT NOT NULL,   -- fixed-width RFC 3339 UTC, sortable
    to_date         TEXT,
    location        TEXT,
    description     TEXT,
    url             TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS event_organiser_idx ON event(organiser_id);
CREATE INDEX IF NOT EXISTS event_from_date_idx ON event(from_date);

PRAGMA user_version = 1;
";
