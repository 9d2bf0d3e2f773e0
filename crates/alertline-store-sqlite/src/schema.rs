//! SQL schema for the durable alert store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    username        TEXT NOT NULL UNIQUE,
    email           TEXT NOT NULL UNIQUE,
    full_name       TEXT,
    phone           TEXT,
    role            TEXT NOT NULL DEFAULT 'user',
    hashed_password TEXT NOT NULL,
    is_active       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL            -- RFC 3339 UTC, microseconds
);

CREATE TABLE IF NOT EXISTS alerts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_type    TEXT NOT NULL,
    severity      TEXT NOT NULL,             -- 'low' | 'medium' | 'high' | 'critical'
    title         TEXT NOT NULL,
    description   TEXT,
    latitude      REAL NOT NULL,
    longitude     REAL NOT NULL,
    location_name TEXT,
    radius        REAL,                      -- km
    status        TEXT NOT NULL DEFAULT 'active',
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_by    INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at    TEXT NOT NULL,             -- never updated
    resolved_at   TEXT
);

CREATE TABLE IF NOT EXISTS locations (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    city          TEXT,
    state         TEXT,
    country       TEXT,
    latitude      REAL NOT NULL,
    longitude     REAL NOT NULL,
    location_type TEXT
);

-- Alerts committed here whose live-mirror write has not succeeded yet.
CREATE TABLE IF NOT EXISTS mirror_outbox (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id   INTEGER NOT NULL REFERENCES alerts(id) ON DELETE CASCADE,
    payload    TEXT NOT NULL,                -- JSON object
    last_error TEXT NOT NULL,
    attempts   INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    claimed_at TEXT                          -- set while a replay is in flight
);

CREATE INDEX IF NOT EXISTS alerts_created_idx  ON alerts(created_at);
CREATE INDEX IF NOT EXISTS alerts_type_idx     ON alerts(alert_type);
CREATE INDEX IF NOT EXISTS alerts_location_idx ON alerts(location_name);
CREATE INDEX IF NOT EXISTS users_role_idx      ON users(role);

PRAGMA user_version = 1;
";
