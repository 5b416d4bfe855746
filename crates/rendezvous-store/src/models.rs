//! Record structs persisted by the store.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use rendezvous_shared::types::{
    AppointmentId, AppointmentStatus, NotificationId, ReadState, Role, UserId,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The identity record behind an authenticated principal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: UserId,
    pub email: Option<String>,
    pub display_name: String,
    /// `None` when the record predates role assignment and needs a backfill.
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

/// A scheduled meeting requested by a student.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    /// Assigned by the store on creation.
    pub id: AppointmentId,
    /// The requesting student. Never reassigned.
    pub owner_user_id: UserId,
    pub subject: String,
    pub location: String,
    pub attendees: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when inserting an appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub owner_user_id: UserId,
    pub subject: String,
    pub location: String,
    pub attendees: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
}

/// Partial update of the descriptive fields. `None` leaves a field as is.
///
/// Ownership and status are deliberately absent: they change only through
/// dedicated transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailsUpdate {
    pub subject: Option<String>,
    pub location: Option<String>,
    pub attendees: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl DetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.location.is_none()
            && self.attendees.is_none()
            && self.date.is_none()
            && self.time.is_none()
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// An addressed message describing a lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub target_user_id: UserId,
    /// The appointment the message is about, if any.
    pub appointment_id: Option<AppointmentId>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read_state: ReadState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub target_user_id: UserId,
    pub appointment_id: Option<AppointmentId>,
    pub message: String,
}
