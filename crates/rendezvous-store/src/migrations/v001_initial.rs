//! v001 -- Initial schema creation.
//!
//! Creates the three core collections: `users`, `appointments` and
//! `notifications`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    uid          TEXT PRIMARY KEY NOT NULL,   -- auth provider id
    email        TEXT,
    display_name TEXT NOT NULL,
    role         TEXT CHECK (role IN ('student', 'staff')),  -- NULL until resolved
    created_at   TEXT NOT NULL                -- RFC-3339
);

-- ----------------------------------------------------------------
-- Appointments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS appointments (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    owner_user_id TEXT NOT NULL,
    subject       TEXT NOT NULL,
    location      TEXT NOT NULL DEFAULT '',
    attendees     TEXT NOT NULL DEFAULT '',
    date          TEXT NOT NULL,              -- YYYY-MM-DD
    time          TEXT NOT NULL,              -- HH:MM
    status        TEXT NOT NULL CHECK (status IN ('Pending', 'Upcoming', 'Confirmed')),
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_owner ON appointments(owner_user_id);

-- ----------------------------------------------------------------
-- Notifications
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id             TEXT PRIMARY KEY NOT NULL, -- UUID v4
    target_user_id TEXT NOT NULL,
    message        TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    read_state     TEXT NOT NULL DEFAULT 'unread' CHECK (read_state IN ('unread', 'read'))
);

CREATE INDEX IF NOT EXISTS idx_notifications_target_ts
    ON notifications(target_user_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
