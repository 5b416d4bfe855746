use rusqlite::Connection;

const UP_SQL: &str = r#"
ALTER TABLE notifications ADD COLUMN appointment_id TEXT;  -- nullable, no FK: cancelled appointments are deleted

CREATE INDEX IF NOT EXISTS idx_notifications_appointment ON notifications(appointment_id);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
