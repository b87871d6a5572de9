//! SQL schema for the tuition directory SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS centres (
    centre_id        TEXT PRIMARY KEY,
    name             TEXT NOT NULL,   -- display name, may carry '(branch)'
    location         TEXT NOT NULL,   -- address, else area
    whatsapp_number  TEXT,
    website          TEXT,
    quality_status   TEXT NOT NULL DEFAULT 'OK',   -- 'OK' | 'NEEDS_REVIEW'
    quality_notes    TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    UNIQUE (name, location)
);

CREATE TABLE IF NOT EXISTS levels (
    level_id  TEXT PRIMARY KEY,
    name      TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE
);

-- Atomic (centre, level, subject) facts. Faceted filters match these rows.
CREATE TABLE IF NOT EXISTS offerings (
    centre_id   TEXT NOT NULL REFERENCES centres(centre_id) ON DELETE CASCADE,
    level_id    TEXT NOT NULL REFERENCES levels(level_id),
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    PRIMARY KEY (centre_id, level_id, subject_id)
);

-- Coarse display links. Never used for combined level+subject filtering.
CREATE TABLE IF NOT EXISTS centre_levels (
    centre_id  TEXT NOT NULL REFERENCES centres(centre_id) ON DELETE CASCADE,
    level_id   TEXT NOT NULL REFERENCES levels(level_id),
    PRIMARY KEY (centre_id, level_id)
);

CREATE TABLE IF NOT EXISTS centre_subjects (
    centre_id   TEXT NOT NULL REFERENCES centres(centre_id) ON DELETE CASCADE,
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    PRIMARY KEY (centre_id, subject_id)
);

CREATE INDEX IF NOT EXISTS offerings_level_subject_idx ON offerings(level_id, subject_id);
CREATE INDEX IF NOT EXISTS offerings_subject_idx       ON offerings(subject_id);

PRAGMA user_version = 1;
";
