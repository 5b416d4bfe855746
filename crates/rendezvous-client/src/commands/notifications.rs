use std::str::FromStr;

use serde::Serialize;

use rendezvous_shared::types::{AppointmentId, NotificationId};
use rendezvous_store::Notification;

use crate::error::LifecycleError;
use crate::events::{emit_event, ClientEvent};
use crate::notify::NotificationRequest;
use crate::state::AppState;

use super::{invalid_input, CommandResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: String,
    pub target_user_id: String,
    pub appointment_id: Option<String>,
    pub message: String,
    pub created_at: String,
    pub read_state: String,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.to_string(),
            target_user_id: n.target_user_id.to_string(),
            appointment_id: n.appointment_id.map(|a| a.to_string()),
            message: n.message,
            created_at: n.created_at.to_rfc3339(),
            read_state: n.read_state.as_str().to_string(),
        }
    }
}

/// Outcome of handing a confirmation notice to the emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DeliveryDto {
    #[serde(rename_all = "camelCase")]
    Sent { notification_id: String },
    /// Accepted by the background worker; the outcome arrives as an event.
    Queued,
    /// The appointment stays confirmed; `retry_confirmation_notice` can be
    /// called again later.
    Failed { error: String },
}

/// Write the notice inline, or queue it when a background worker runs.
pub(crate) async fn deliver(state: &AppState, request: NotificationRequest) -> DeliveryDto {
    if let Some(queue) = &state.notification_queue {
        return match queue.enqueue(request).await {
            Ok(()) => DeliveryDto::Queued,
            Err(e) => DeliveryDto::Failed {
                error: e.to_string(),
            },
        };
    }

    match state.emitter.emit(&request).await {
        Ok(notification) => {
            emit_event(
                &state.events,
                ClientEvent::NotificationDelivered {
                    notification_id: notification.id,
                    appointment_id: request.appointment_id,
                    target_user_id: notification.target_user_id,
                },
            );
            DeliveryDto::Sent {
                notification_id: notification.id.to_string(),
            }
        }
        Err(e) => {
            let error = match &e {
                LifecycleError::NotificationFailed { source, .. } => source.to_string(),
                other => other.to_string(),
            };
            emit_event(
                &state.events,
                ClientEvent::NotificationFailed {
                    appointment_id: request.appointment_id,
                    target_user_id: request.target_user_id,
                    error: error.clone(),
                },
            );
            DeliveryDto::Failed { error }
        }
    }
}

pub async fn list_notifications(state: &AppState) -> CommandResult<Vec<NotificationDto>> {
    let session = state.require_session().await?;
    let notifications = state.inbox.list_for(&session).await?;
    Ok(notifications.into_iter().map(NotificationDto::from).collect())
}

pub async fn unread_count(state: &AppState) -> CommandResult<usize> {
    let session = state.require_session().await?;
    Ok(state.inbox.unread_count(&session).await?)
}

pub async fn mark_notification_read(
    state: &AppState,
    notification_id: String,
) -> CommandResult<NotificationDto> {
    let id = NotificationId::from_str(&notification_id).map_err(invalid_input)?;
    let session = state.require_session().await?;
    Ok(state.inbox.mark_read(&session, id).await?.into())
}

/// Re-send the confirmation notice for a confirmed appointment. The notice
/// is rebuilt from the stored record, so callers cannot supply its content.
pub async fn retry_confirmation_notice(
    state: &AppState,
    appointment_id: String,
) -> CommandResult<DeliveryDto> {
    let id = AppointmentId::from_str(&appointment_id).map_err(invalid_input)?;
    let session = state.require_session().await?;
    let request = state.lifecycle.confirmation_notice(&session, id).await?;
    Ok(deliver(state, request).await)
}
