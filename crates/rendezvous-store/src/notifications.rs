use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use rendezvous_shared::types::{AppointmentId, NotificationId, ReadState, UserId};

use crate::database::{conversion_error, parse_timestamp, Database};
use crate::error::Result;
use crate::models::{NewNotification, Notification};

impl Database {
    /// Persist a new notification in the `unread` state.
    pub fn insert_notification(&self, new: &NewNotification) -> Result<Notification> {
        let notification = Notification {
            id: NotificationId::new(),
            target_user_id: new.target_user_id.clone(),
            appointment_id: new.appointment_id,
            message: new.message.clone(),
            created_at: Utc::now(),
            read_state: ReadState::Unread,
        };

        self.conn().execute(
            "INSERT INTO notifications
                (id, target_user_id, appointment_id, message, created_at, read_state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                notification.id.to_string(),
                notification.target_user_id.as_str(),
                notification.appointment_id.map(|a| a.to_string()),
                notification.message,
                notification.created_at.to_rfc3339(),
                notification.read_state.as_str(),
            ],
        )?;

        Ok(notification)
    }

    pub fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        let notification = self
            .conn()
            .query_row(
                "SELECT id, target_user_id, appointment_id, message, created_at, read_state
                 FROM notifications WHERE id = ?1",
                params![id.to_string()],
                row_to_notification,
            )
            .optional()?;
        Ok(notification)
    }

    /// Notifications addressed to `target`, newest first.
    pub fn list_notifications(&self, target: &UserId) -> Result<Vec<Notification>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, target_user_id, appointment_id, message, created_at, read_state
             FROM notifications
             WHERE target_user_id = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![target.as_str()], row_to_notification)?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }

    pub fn set_read_state(&self, id: NotificationId, state: ReadState) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE notifications SET read_state = ?1 WHERE id = ?2",
            params![state.as_str(), id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let id_str: String = row.get(0)?;
    let target: String = row.get(1)?;
    let appointment_str: Option<String> = row.get(2)?;
    let message: String = row.get(3)?;
    let ts_str: String = row.get(4)?;
    let state_str: String = row.get(5)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_error(0, e))?;
    let appointment_id = appointment_str
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| conversion_error(2, e))?
        .map(AppointmentId);
    let read_state = state_str
        .parse::<ReadState>()
        .map_err(|e| conversion_error(5, e))?;

    Ok(Notification {
        id: NotificationId(id),
        target_user_id: UserId(target),
        appointment_id,
        message,
        created_at: parse_timestamp(4, &ts_str)?,
        read_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_notification(target: &str, message: &str) -> NewNotification {
        NewNotification {
            target_user_id: UserId::new(target),
            appointment_id: Some(AppointmentId::new()),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_insert_is_unread() {
        let db = Database::open_in_memory().unwrap();
        let n = db.insert_notification(&new_notification("alice", "hello")).unwrap();
        assert_eq!(n.read_state, ReadState::Unread);

        let fetched = db.get_notification(n.id).unwrap().unwrap();
        assert_eq!(fetched, n);
    }

    #[test]
    fn test_list_is_scoped_to_target() {
        let db = Database::open_in_memory().unwrap();
        db.insert_notification(&new_notification("alice", "one")).unwrap();
        db.insert_notification(&new_notification("bob", "two")).unwrap();
        db.insert_notification(&new_notification("alice", "three")).unwrap();

        let alice = db.list_notifications(&UserId::new("alice")).unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|n| n.target_user_id.as_str() == "alice"));
    }

    #[test]
    fn test_set_read_state() {
        let db = Database::open_in_memory().unwrap();
        let n = db.insert_notification(&new_notification("alice", "hello")).unwrap();

        assert!(db.set_read_state(n.id, ReadState::Read).unwrap());
        assert_eq!(
            db.get_notification(n.id).unwrap().unwrap().read_state,
            ReadState::Read
        );
        assert!(!db.set_read_state(NotificationId::new(), ReadState::Read).unwrap());
    }
}
