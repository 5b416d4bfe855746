//! Store wrapper that counts writes and fails on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use rendezvous_shared::types::{
    AppointmentId, AppointmentStatus, NotificationId, ReadState, Role, UserId,
};
use rendezvous_store::*;

pub(crate) struct FlakyStore {
    inner: SqliteStore,
    /// Every call fails with [`StoreError::Unavailable`].
    pub fail_all: AtomicBool,
    /// Only notification inserts fail.
    pub fail_notifications: AtomicBool,
    pub role_writes: AtomicUsize,
    pub notification_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("in-memory store"),
            fail_all: AtomicBool::new(false),
            fail_notifications: AtomicBool::new(false),
            role_writes: AtomicUsize::new(0),
            notification_writes: AtomicUsize::new(0),
        }
    }

    fn check(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for FlakyStore {
    async fn insert_user(&self, user: &UserRecord) -> Result<()> {
        self.check()?;
        self.inner.insert_user(user).await
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>> {
        self.check()?;
        self.inner.get_user(user_id).await
    }

    async fn set_role_if_missing(&self, user_id: &UserId, role: Role) -> Result<bool> {
        self.check()?;
        self.role_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_role_if_missing(user_id, role).await
    }

    async fn set_display_name(&self, user_id: &UserId, display_name: &str) -> Result<bool> {
        self.check()?;
        self.inner.set_display_name(user_id, display_name).await
    }

    async fn insert_appointment(&self, new: &NewAppointment) -> Result<Appointment> {
        self.check()?;
        self.inner.insert_appointment(new).await
    }

    async fn get_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        self.check()?;
        self.inner.get_appointment(id).await
    }

    async fn list_appointments(&self, owner: Option<&UserId>) -> Result<Vec<Appointment>> {
        self.check()?;
        self.inner.list_appointments(owner).await
    }

    async fn update_appointment_details(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        update: &DetailsUpdate,
    ) -> Result<bool> {
        self.check()?;
        self.inner.update_appointment_details(id, expected, update).await
    }

    async fn transition_status(
        &self,
        id: AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<bool> {
        self.check()?;
        self.inner.transition_status(id, from, to).await
    }

    async fn delete_appointment_if_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
    ) -> Result<bool> {
        self.check()?;
        self.inner.delete_appointment_if_status(id, expected).await
    }

    async fn insert_notification(&self, new: &NewNotification) -> Result<Notification> {
        self.check()?;
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected notification outage".into()));
        }
        self.notification_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_notification(new).await
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        self.check()?;
        self.inner.get_notification(id).await
    }

    async fn list_notifications(&self, target: &UserId) -> Result<Vec<Notification>> {
        self.check()?;
        self.inner.list_notifications(target).await
    }

    async fn set_read_state(&self, id: NotificationId, state: ReadState) -> Result<bool> {
        self.check()?;
        self.inner.set_read_state(id, state).await
    }
}
