//! CRUD operations for [`UserRecord`] rows.

use rusqlite::{params, OptionalExtension};

use rendezvous_shared::types::{Role, UserId};

use crate::database::{conversion_error, parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::UserRecord;

impl Database {
    /// Insert a new identity record. Fails with [`StoreError::Conflict`] when
    /// the user id is already known.
    pub fn insert_user(&self, user: &UserRecord) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (uid, email, display_name, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.user_id.as_str(),
                    user.email,
                    user.display_name,
                    user.role.map(|r| r.as_str()),
                    user.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::Conflict(format!("user {}", user.user_id))
                }
                other => StoreError::Sqlite(other),
            })?;
        Ok(())
    }

    /// Fetch an identity record by uid.
    pub fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>> {
        let user = self
            .conn()
            .query_row(
                "SELECT uid, email, display_name, role, created_at
                 FROM users
                 WHERE uid = ?1",
                params![user_id.as_str()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Store `role` only if the record has none yet. Returns `true` when a
    /// row was written.
    pub fn set_role_if_missing(&self, user_id: &UserId, role: Role) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET role = ?1 WHERE uid = ?2 AND role IS NULL",
            params![role.as_str(), user_id.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// Replace the display name. Returns `false` if the user is unknown.
    pub fn set_display_name(&self, user_id: &UserId, display_name: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET display_name = ?1 WHERE uid = ?2",
            params![display_name, user_id.as_str()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    let uid: String = row.get(0)?;
    let email: Option<String> = row.get(1)?;
    let display_name: String = row.get(2)?;
    let role_str: Option<String> = row.get(3)?;
    let created_str: String = row.get(4)?;

    let role = role_str
        .map(|r| r.parse::<Role>())
        .transpose()
        .map_err(|e| conversion_error(3, e))?;

    Ok(UserRecord {
        user_id: UserId(uid),
        email,
        display_name,
        role,
        created_at: parse_timestamp(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn user(uid: &str, role: Option<Role>) -> UserRecord {
        UserRecord {
            user_id: UserId::new(uid),
            email: Some(format!("{uid}@example.com")),
            display_name: "N/A".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_get_user() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&user("alice", Some(Role::Staff))).unwrap();

        let fetched = db.get_user(&UserId::new("alice")).unwrap().unwrap();
        assert_eq!(fetched.role, Some(Role::Staff));
        assert_eq!(fetched.email.as_deref(), Some("alice@example.com"));

        assert!(db.get_user(&UserId::new("nobody")).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_user_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&user("bob", None)).unwrap();
        assert!(matches!(
            db.insert_user(&user("bob", None)),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_set_role_if_missing_writes_once() {
        let db = Database::open_in_memory().unwrap();
        let uid = UserId::new("carol");
        db.insert_user(&user("carol", None)).unwrap();

        assert!(db.set_role_if_missing(&uid, Role::Student).unwrap());
        assert!(!db.set_role_if_missing(&uid, Role::Staff).unwrap());
        assert_eq!(db.get_user(&uid).unwrap().unwrap().role, Some(Role::Student));
    }

    #[test]
    fn test_set_display_name() {
        let db = Database::open_in_memory().unwrap();
        let uid = UserId::new("dave");
        db.insert_user(&user("dave", Some(Role::Student))).unwrap();

        assert!(db.set_display_name(&uid, "Dave D.").unwrap());
        let fetched = db.get_user(&uid).unwrap().unwrap();
        assert_eq!(fetched.display_name, "Dave D.");
        assert_eq!(fetched.role, Some(Role::Student));

        assert!(!db.set_display_name(&UserId::new("nobody"), "X").unwrap());
    }
}
