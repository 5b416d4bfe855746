//! Confirmation notices.
//!
//! A confirm hands back a [`NotificationRequest`]; writing the notice is a
//! separate step, either inline through [`NotificationEmitter::emit`] or on the
//! background task started by [`spawn_notification_worker`]. A failed write
//! never undoes the confirm.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rendezvous_shared::types::{
    format_date, format_time, AppointmentId, NotificationId, ReadState, UserId,
};
use rendezvous_store::{Appointment, AppointmentStore, NewNotification, Notification, StoreError};

use crate::error::{LifecycleError, Result};
use crate::events::{emit_event, ClientEvent, EventSender};
use crate::identity::Session;

/// Everything needed to write one confirmation notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub appointment_id: AppointmentId,
    pub target_user_id: UserId,
    pub subject: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl NotificationRequest {
    /// Notice addressed to the owner of a just-confirmed appointment.
    pub fn confirmed(appointment: &Appointment) -> Self {
        Self {
            appointment_id: appointment.id,
            target_user_id: appointment.owner_user_id.clone(),
            subject: appointment.subject.clone(),
            date: appointment.date,
            time: appointment.time,
        }
    }

    pub fn message(&self) -> String {
        format!(
            "Your appointment with subject \"{}\" on {} at {} has been confirmed. \
             Please print the appointment letter",
            self.subject,
            format_date(self.date),
            format_time(self.time),
        )
    }
}

#[derive(Clone)]
pub struct NotificationEmitter {
    store: Arc<dyn AppointmentStore>,
}

impl NotificationEmitter {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Persist the notice as unread. One attempt; a failure carries the
    /// request back so the caller can retry just this step.
    pub async fn emit(&self, request: &NotificationRequest) -> Result<Notification> {
        let new = NewNotification {
            target_user_id: request.target_user_id.clone(),
            appointment_id: Some(request.appointment_id),
            message: request.message(),
        };

        match self.store.insert_notification(&new).await {
            Ok(notification) => {
                info!(
                    notification = %notification.id,
                    appointment = %request.appointment_id,
                    target = %request.target_user_id.short(),
                    "notification emitted"
                );
                Ok(notification)
            }
            Err(source) => {
                warn!(
                    appointment = %request.appointment_id,
                    error = %source,
                    "notification write failed"
                );
                Err(LifecycleError::NotificationFailed {
                    request: Box::new(request.clone()),
                    source,
                })
            }
        }
    }
}

/// Sending half of the background notification worker.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<NotificationRequest>,
}

impl NotificationQueue {
    /// Hand a request to the worker. Fails only if the worker has stopped.
    pub async fn enqueue(&self, request: NotificationRequest) -> Result<()> {
        self.tx.send(request).await.map_err(|e| {
            let request = e.0;
            LifecycleError::NotificationFailed {
                request: Box::new(request),
                source: StoreError::Unavailable("notification worker stopped".into()),
            }
        })
    }
}

/// Start the task that writes queued notices and reports each outcome as a
/// [`ClientEvent`]. The task ends once every [`NotificationQueue`] clone is
/// dropped. Must be called from within a Tokio runtime.
pub fn spawn_notification_worker(
    emitter: NotificationEmitter,
    events: EventSender,
    capacity: usize,
) -> (NotificationQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<NotificationRequest>(capacity.max(1));

    let handle = tokio::spawn(async move {
        info!("notification worker started");

        while let Some(request) = rx.recv().await {
            match emitter.emit(&request).await {
                Ok(notification) => emit_event(
                    &events,
                    ClientEvent::NotificationDelivered {
                        notification_id: notification.id,
                        appointment_id: request.appointment_id,
                        target_user_id: notification.target_user_id,
                    },
                ),
                Err(e) => emit_event(
                    &events,
                    ClientEvent::NotificationFailed {
                        appointment_id: request.appointment_id,
                        target_user_id: request.target_user_id.clone(),
                        error: e.to_string(),
                    },
                ),
            }
        }

        debug!("notification queue closed, worker exiting");
    });

    (NotificationQueue { tx }, handle)
}

/// Read side of the notifications collection, scoped to the caller.
#[derive(Clone)]
pub struct NotificationInbox {
    store: Arc<dyn AppointmentStore>,
}

impl NotificationInbox {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// The caller's notices, newest first.
    pub async fn list_for(&self, session: &Session) -> Result<Vec<Notification>> {
        let mut notifications = self.store.list_notifications(&session.user_id).await?;
        notifications.retain(|n| n.target_user_id == session.user_id);
        Ok(notifications)
    }

    pub async fn unread_count(&self, session: &Session) -> Result<usize> {
        Ok(self
            .list_for(session)
            .await?
            .iter()
            .filter(|n| n.read_state == ReadState::Unread)
            .count())
    }

    /// Mark one of the caller's notices as read.
    pub async fn mark_read(&self, session: &Session, id: NotificationId) -> Result<Notification> {
        let mut notification = self
            .store
            .get_notification(id)
            .await?
            .ok_or_else(|| LifecycleError::notification_not_found(id))?;

        if notification.target_user_id != session.user_id {
            return Err(LifecycleError::Forbidden(
                "notification is addressed to another user".into(),
            ));
        }

        if notification.read_state == ReadState::Read {
            return Ok(notification);
        }

        if !self.store.set_read_state(id, ReadState::Read).await? {
            return Err(LifecycleError::notification_not_found(id));
        }

        notification.read_state = ReadState::Read;
        Ok(notification)
    }
}
