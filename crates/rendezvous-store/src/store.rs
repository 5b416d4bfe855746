//! The adapter contract the appointment core is written against.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rendezvous_shared::types::{
    AppointmentId, AppointmentStatus, NotificationId, ReadState, Role, UserId,
};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::*;

/// Persistence boundary for users, appointments and notifications.
///
/// Every call is a potential suspension point with a single attempt; retry
/// policy, if any, belongs to the implementation. Filters are equality only.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    // ───────────────────────────── Users ─────────────────────────────

    async fn insert_user(&self, user: &UserRecord) -> Result<()>;

    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>>;

    /// Conditional backfill: writes only when the stored role is absent.
    async fn set_role_if_missing(&self, user_id: &UserId, role: Role) -> Result<bool>;

    async fn set_display_name(&self, user_id: &UserId, display_name: &str) -> Result<bool>;

    // ────────────────────────── Appointments ─────────────────────────

    async fn insert_appointment(&self, new: &NewAppointment) -> Result<Appointment>;

    async fn get_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>>;

    /// All appointments, or only `owner`'s when given.
    async fn list_appointments(&self, owner: Option<&UserId>) -> Result<Vec<Appointment>>;

    async fn update_appointment_details(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        update: &DetailsUpdate,
    ) -> Result<bool>;

    async fn transition_status(
        &self,
        id: AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<bool>;

    async fn delete_appointment_if_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
    ) -> Result<bool>;

    // ────────────────────────── Notifications ────────────────────────

    async fn insert_notification(&self, new: &NewNotification) -> Result<Notification>;

    async fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>>;

    async fn list_notifications(&self, target: &UserId) -> Result<Vec<Notification>>;

    async fn set_read_state(&self, id: NotificationId, state: ReadState) -> Result<bool>;
}

/// [`AppointmentStore`] backed by a local SQLite [`Database`].
///
/// The connection sits behind a mutex that is never held across an await.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let guard = self.db.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&guard)
    }
}

#[async_trait]
impl AppointmentStore for SqliteStore {
    async fn insert_user(&self, user: &UserRecord) -> Result<()> {
        self.with_db(|db| db.insert_user(user))
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>> {
        self.with_db(|db| db.get_user(user_id))
    }

    async fn set_role_if_missing(&self, user_id: &UserId, role: Role) -> Result<bool> {
        self.with_db(|db| db.set_role_if_missing(user_id, role))
    }

    async fn set_display_name(&self, user_id: &UserId, display_name: &str) -> Result<bool> {
        self.with_db(|db| db.set_display_name(user_id, display_name))
    }

    async fn insert_appointment(&self, new: &NewAppointment) -> Result<Appointment> {
        self.with_db(|db| db.insert_appointment(new))
    }

    async fn get_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        self.with_db(|db| db.get_appointment(id))
    }

    async fn list_appointments(&self, owner: Option<&UserId>) -> Result<Vec<Appointment>> {
        self.with_db(|db| db.list_appointments(owner))
    }

    async fn update_appointment_details(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        update: &DetailsUpdate,
    ) -> Result<bool> {
        self.with_db(|db| db.update_appointment_details(id, expected, update))
    }

    async fn transition_status(
        &self,
        id: AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<bool> {
        self.with_db(|db| db.transition_status(id, from, to))
    }

    async fn delete_appointment_if_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
    ) -> Result<bool> {
        self.with_db(|db| db.delete_appointment_if_status(id, expected))
    }

    async fn insert_notification(&self, new: &NewNotification) -> Result<Notification> {
        self.with_db(|db| db.insert_notification(new))
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        self.with_db(|db| db.get_notification(id))
    }

    async fn list_notifications(&self, target: &UserId) -> Result<Vec<Notification>> {
        self.with_db(|db| db.list_notifications(target))
    }

    async fn set_read_state(&self, id: NotificationId, state: ReadState) -> Result<bool> {
        self.with_db(|db| db.set_read_state(id, state))
    }
}
