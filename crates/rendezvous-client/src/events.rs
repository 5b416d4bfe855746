use serde::Serialize;
use tokio::sync::broadcast;

use rendezvous_shared::types::{AppointmentId, NotificationId, UserId};

pub const EVENT_APPOINTMENT_CREATED: &str = "appointment-created";
pub const EVENT_APPOINTMENT_CONFIRMED: &str = "appointment-confirmed";
pub const EVENT_APPOINTMENT_CANCELLED: &str = "appointment-cancelled";
pub const EVENT_NOTIFICATION_DELIVERED: &str = "notification-delivered";
pub const EVENT_NOTIFICATION_FAILED: &str = "notification-failed";

/// Lifecycle events pushed to whatever UI layer subscribes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    AppointmentCreated {
        appointment_id: AppointmentId,
        owner_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    AppointmentConfirmed {
        appointment_id: AppointmentId,
        owner_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    AppointmentCancelled { appointment_id: AppointmentId },
    #[serde(rename_all = "camelCase")]
    NotificationDelivered {
        notification_id: NotificationId,
        appointment_id: AppointmentId,
        target_user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    NotificationFailed {
        appointment_id: AppointmentId,
        target_user_id: UserId,
        error: String,
    },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AppointmentCreated { .. } => EVENT_APPOINTMENT_CREATED,
            Self::AppointmentConfirmed { .. } => EVENT_APPOINTMENT_CONFIRMED,
            Self::AppointmentCancelled { .. } => EVENT_APPOINTMENT_CANCELLED,
            Self::NotificationDelivered { .. } => EVENT_NOTIFICATION_DELIVERED,
            Self::NotificationFailed { .. } => EVENT_NOTIFICATION_FAILED,
        }
    }
}

pub type EventSender = broadcast::Sender<ClientEvent>;

pub fn emit_event(tx: &EventSender, event: ClientEvent) {
    let name = event.name();
    if tx.send(event).is_err() {
        tracing::debug!(event = name, "no event subscribers");
    }
}
