//! CRUD operations for [`Appointment`] records.
//!
//! Status changes go through [`Database::transition_status`] and
//! [`Database::delete_appointment_if_status`], which are single conditional
//! writes: they only touch the row while it still holds the expected status.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use rendezvous_shared::types::{
    format_date, format_time, parse_date, parse_time, AppointmentId, AppointmentStatus, UserId,
};

use crate::database::{conversion_error, parse_timestamp, Database};
use crate::error::Result;
use crate::models::{Appointment, DetailsUpdate, NewAppointment};

const SELECT_COLUMNS: &str =
    "SELECT id, owner_user_id, subject, location, attendees, date, time, status, created_at
     FROM appointments";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new appointment and return it with its store-assigned id.
    pub fn insert_appointment(&self, new: &NewAppointment) -> Result<Appointment> {
        let appointment = Appointment {
            id: AppointmentId::new(),
            owner_user_id: new.owner_user_id.clone(),
            subject: new.subject.clone(),
            location: new.location.clone(),
            attendees: new.attendees.clone(),
            date: new.date,
            time: new.time,
            status: new.status,
            created_at: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO appointments
                (id, owner_user_id, subject, location, attendees, date, time, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                appointment.id.to_string(),
                appointment.owner_user_id.as_str(),
                appointment.subject,
                appointment.location,
                appointment.attendees,
                format_date(appointment.date),
                format_time(appointment.time),
                appointment.status.as_str(),
                appointment.created_at.to_rfc3339(),
            ],
        )?;

        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let appointment = self
            .conn()
            .query_row(&sql, params![id.to_string()], row_to_appointment)
            .optional()?;
        Ok(appointment)
    }

    /// List appointments in calendar order. With `owner` set, only that
    /// user's appointments are returned.
    pub fn list_appointments(&self, owner: Option<&UserId>) -> Result<Vec<Appointment>> {
        let mut appointments = Vec::new();

        match owner {
            Some(owner) => {
                let sql = format!(
                    "{SELECT_COLUMNS} WHERE owner_user_id = ?1 ORDER BY date, time, created_at"
                );
                let mut stmt = self.conn().prepare(&sql)?;
                let rows = stmt.query_map(params![owner.as_str()], row_to_appointment)?;
                for row in rows {
                    appointments.push(row?);
                }
            }
            None => {
                let sql = format!("{SELECT_COLUMNS} ORDER BY date, time, created_at");
                let mut stmt = self.conn().prepare(&sql)?;
                let rows = stmt.query_map([], row_to_appointment)?;
                for row in rows {
                    appointments.push(row?);
                }
            }
        }

        Ok(appointments)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial update to the descriptive fields while the record still
    /// has status `expected`. Returns `true` if a row was updated.
    pub fn update_appointment_details(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        update: &DetailsUpdate,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE appointments SET
                subject   = COALESCE(?1, subject),
                location  = COALESCE(?2, location),
                attendees = COALESCE(?3, attendees),
                date      = COALESCE(?4, date),
                time      = COALESCE(?5, time)
             WHERE id = ?6 AND status = ?7",
            params![
                update.subject,
                update.location,
                update.attendees,
                update.date.map(format_date),
                update.time.map(format_time),
                id.to_string(),
                expected.as_str(),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Move a record from `from` to `to`. Returns `false` if the record is
    /// absent or no longer in `from`.
    pub fn transition_status(
        &self,
        id: AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE appointments SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.as_str(), id.to_string(), from.as_str()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a record only while it has status `expected`.  Returns `true`
    /// if a row was deleted.
    pub fn delete_appointment_if_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM appointments WHERE id = ?1 AND status = ?2",
            params![id.to_string(), expected.as_str()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_appointment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    let id_str: String = row.get(0)?;
    let owner: String = row.get(1)?;
    let subject: String = row.get(2)?;
    let location: String = row.get(3)?;
    let attendees: String = row.get(4)?;
    let date_str: String = row.get(5)?;
    let time_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let created_str: String = row.get(8)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_error(0, e))?;
    let date = parse_date(&date_str).map_err(|e| conversion_error(5, e))?;
    let time = parse_time(&time_str).map_err(|e| conversion_error(6, e))?;
    let status = status_str
        .parse::<AppointmentStatus>()
        .map_err(|e| conversion_error(7, e))?;

    Ok(Appointment {
        id: AppointmentId(id),
        owner_user_id: UserId(owner),
        subject,
        location,
        attendees,
        date,
        time,
        status,
        created_at: parse_timestamp(8, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_appointment(owner: &str, date: &str, status: AppointmentStatus) -> NewAppointment {
        NewAppointment {
            owner_user_id: UserId::new(owner),
            subject: "Advising".to_string(),
            location: "Room 4".to_string(),
            attendees: "Dr. Reyes".to_string(),
            date: parse_date(date).unwrap(),
            time: parse_time("10:00").unwrap(),
            status,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .insert_appointment(&new_appointment("alice", "2024-05-01", AppointmentStatus::Pending))
            .unwrap();

        let fetched = db.get_appointment(created.id).unwrap().unwrap();
        assert_eq!(fetched.subject, "Advising");
        assert_eq!(fetched.status, AppointmentStatus::Pending);
        assert_eq!(fetched.owner_user_id, UserId::new("alice"));

        assert!(db.get_appointment(AppointmentId::new()).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_by_owner_and_sorts_by_date() {
        let db = Database::open_in_memory().unwrap();
        db.insert_appointment(&new_appointment("alice", "2024-06-01", AppointmentStatus::Pending))
            .unwrap();
        db.insert_appointment(&new_appointment("bob", "2024-05-15", AppointmentStatus::Pending))
            .unwrap();
        db.insert_appointment(&new_appointment("alice", "2024-05-01", AppointmentStatus::Upcoming))
            .unwrap();

        let all = db.list_appointments(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(format_date(all[0].date), "2024-05-01");

        let alice = db.list_appointments(Some(&UserId::new("alice"))).unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|a| a.owner_user_id.as_str() == "alice"));
    }

    #[test]
    fn test_transition_is_conditional() {
        let db = Database::open_in_memory().unwrap();
        let appt = db
            .insert_appointment(&new_appointment("alice", "2024-05-01", AppointmentStatus::Pending))
            .unwrap();

        assert!(db
            .transition_status(appt.id, AppointmentStatus::Pending, AppointmentStatus::Confirmed)
            .unwrap());
        assert!(!db
            .transition_status(appt.id, AppointmentStatus::Pending, AppointmentStatus::Confirmed)
            .unwrap());
        assert_eq!(
            db.get_appointment(appt.id).unwrap().unwrap().status,
            AppointmentStatus::Confirmed
        );
    }

    #[test]
    fn test_delete_if_status() {
        let db = Database::open_in_memory().unwrap();
        let appt = db
            .insert_appointment(&new_appointment(
                "alice",
                "2024-05-01",
                AppointmentStatus::Upcoming,
            ))
            .unwrap();

        assert!(!db
            .delete_appointment_if_status(appt.id, AppointmentStatus::Pending)
            .unwrap());
        assert!(db
            .delete_appointment_if_status(appt.id, AppointmentStatus::Upcoming)
            .unwrap());
        assert!(db.get_appointment(appt.id).unwrap().is_none());
    }

    #[test]
    fn test_update_details_keeps_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        let appt = db
            .insert_appointment(&new_appointment("alice", "2024-05-01", AppointmentStatus::Pending))
            .unwrap();

        let update = DetailsUpdate {
            location: Some("Library".to_string()),
            ..Default::default()
        };
        assert!(db
            .update_appointment_details(appt.id, AppointmentStatus::Pending, &update)
            .unwrap());

        let fetched = db.get_appointment(appt.id).unwrap().unwrap();
        assert_eq!(fetched.location, "Library");
        assert_eq!(fetched.subject, "Advising");

        assert!(!db
            .update_appointment_details(appt.id, AppointmentStatus::Confirmed, &update)
            .unwrap());
    }
}
