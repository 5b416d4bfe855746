use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use rendezvous_shared::types::{
    format_date, format_time, parse_date, parse_time, AppointmentId, UserId,
};
use rendezvous_store::Appointment;

use crate::events::{emit_event, ClientEvent};
use crate::export::ExportDocument;
use crate::identity::Session;
use crate::lifecycle::{allowed_actions, AllowedActions, AppointmentDraft, AppointmentPatch};
use crate::state::AppState;

use super::notifications::{deliver, DeliveryDto};
use super::{invalid_input, CommandResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDto {
    pub id: String,
    pub owner_user_id: String,
    pub subject: String,
    pub location: String,
    pub attendees: String,
    pub date: String,
    pub time: String,
    pub status: String,
    pub created_at: String,
    /// Which buttons the UI should offer to this caller.
    pub actions: AllowedActions,
}

impl AppointmentDto {
    fn for_session(session: &Session, a: Appointment) -> Self {
        let actions = allowed_actions(session, &a);
        Self {
            id: a.id.to_string(),
            owner_user_id: a.owner_user_id.to_string(),
            subject: a.subject,
            location: a.location,
            attendees: a.attendees,
            date: format_date(a.date),
            time: format_time(a.time),
            status: a.status.as_str().to_string(),
            created_at: a.created_at.to_rfc3339(),
            actions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentArgs {
    pub subject: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub attendees: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentArgs {
    pub subject: Option<String>,
    pub location: Option<String>,
    pub attendees: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub owner_user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDto {
    pub appointment: AppointmentDto,
    pub notification: DeliveryDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDto {
    pub file_name: String,
    pub document: ExportDocument,
    pub text: String,
    pub html: String,
}

fn parse_id(id: &str) -> CommandResult<AppointmentId> {
    AppointmentId::from_str(id).map_err(invalid_input)
}

pub async fn create_appointment(
    state: &AppState,
    args: CreateAppointmentArgs,
) -> CommandResult<AppointmentDto> {
    let session = state.require_session().await?;

    let draft = AppointmentDraft {
        subject: args.subject,
        location: args.location,
        attendees: args.attendees,
        date: parse_date(&args.date).map_err(invalid_input)?,
        time: parse_time(&args.time).map_err(invalid_input)?,
    };
    let appointment = state.lifecycle.create(&session, draft).await?;

    emit_event(
        &state.events,
        ClientEvent::AppointmentCreated {
            appointment_id: appointment.id,
            owner_user_id: appointment.owner_user_id.clone(),
        },
    );
    Ok(AppointmentDto::for_session(&session, appointment))
}

pub async fn list_appointments(state: &AppState) -> CommandResult<Vec<AppointmentDto>> {
    let session = state.require_session().await?;
    let appointments = state.lifecycle.list(&session).await?;
    Ok(appointments
        .into_iter()
        .map(|a| AppointmentDto::for_session(&session, a))
        .collect())
}

pub async fn get_appointment(state: &AppState, id: String) -> CommandResult<AppointmentDto> {
    let id = parse_id(&id)?;
    let session = state.require_session().await?;
    let appointment = state.lifecycle.get(&session, id).await?;
    Ok(AppointmentDto::for_session(&session, appointment))
}

pub async fn update_appointment(
    state: &AppState,
    id: String,
    args: UpdateAppointmentArgs,
) -> CommandResult<AppointmentDto> {
    let id = parse_id(&id)?;
    let session = state.require_session().await?;

    let patch = AppointmentPatch {
        subject: args.subject,
        location: args.location,
        attendees: args.attendees,
        date: args.date.as_deref().map(parse_date).transpose().map_err(invalid_input)?,
        time: args.time.as_deref().map(parse_time).transpose().map_err(invalid_input)?,
        owner_user_id: args.owner_user_id.map(UserId::new),
    };
    let appointment = state.lifecycle.update_details(&session, id, patch).await?;
    Ok(AppointmentDto::for_session(&session, appointment))
}

/// Staff confirm. The status change is reported even when the notice could
/// not be written; `notification` says what happened to it.
pub async fn confirm_appointment(state: &AppState, id: String) -> CommandResult<ConfirmDto> {
    let id = parse_id(&id)?;
    let session = state.require_session().await?;

    let confirmed = state.lifecycle.confirm(&session, id).await?;
    emit_event(
        &state.events,
        ClientEvent::AppointmentConfirmed {
            appointment_id: confirmed.appointment.id,
            owner_user_id: confirmed.appointment.owner_user_id.clone(),
        },
    );

    let notification = deliver(state, confirmed.notification).await;
    if let DeliveryDto::Failed { error } = &notification {
        warn!(appointment = %id, %error, "confirmed without notice");
    }

    Ok(ConfirmDto {
        appointment: AppointmentDto::for_session(&session, confirmed.appointment),
        notification,
    })
}

/// Owner cancel. Returns the id of the removed appointment.
pub async fn cancel_appointment(state: &AppState, id: String) -> CommandResult<String> {
    let id = parse_id(&id)?;
    let session = state.require_session().await?;

    let removed = state.lifecycle.cancel(&session, id).await?;
    emit_event(
        &state.events,
        ClientEvent::AppointmentCancelled {
            appointment_id: removed.id,
        },
    );
    Ok(removed.id.to_string())
}

pub async fn export_appointment(state: &AppState, id: String) -> CommandResult<ExportDto> {
    let id = parse_id(&id)?;
    let session = state.require_session().await?;

    let document = state.lifecycle.export(&session, id).await?;
    Ok(ExportDto {
        file_name: document.file_name(),
        text: document.to_text(),
        html: document.to_html(),
        document,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use rendezvous_shared::identity::{Principal, StaffAllowList};
    use rendezvous_shared::types::AppointmentStatus;
    use rendezvous_store::AppointmentStore;

    use super::*;
    use crate::commands::{identity, notifications};
    use crate::identity::StaticIdentity;
    use crate::testing::FlakyStore;
    use crate::ClientConfig;

    const STAFF_EMAIL: &str = "registrar@campus.example";

    async fn become_user(state: &AppState, provider: &StaticIdentity, uid: &str, email: &str) {
        identity::sign_out(state).await.unwrap();
        provider.set(Principal::new(uid, Some(email.to_string())));
        if identity::sign_in(state).await.is_err() {
            identity::sign_up(state, None).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_confirm_survives_notification_outage() {
        let store = Arc::new(FlakyStore::new());
        let provider = Arc::new(StaticIdentity::default());
        let config = ClientConfig {
            staff_emails: StaffAllowList::new([STAFF_EMAIL]),
            background_notifications: false,
            ..ClientConfig::default()
        };
        let state = AppState::with_store(config, store.clone(), provider.clone());

        become_user(&state, &provider, "alice", "alice@campus.example").await;
        let created = create_appointment(
            &state,
            CreateAppointmentArgs {
                subject: "Advising".to_string(),
                location: "Room 4".to_string(),
                attendees: String::new(),
                date: "2024-05-01".to_string(),
                time: "10:00".to_string(),
            },
        )
        .await
        .unwrap();

        become_user(&state, &provider, "staff-1", STAFF_EMAIL).await;
        store.fail_notifications.store(true, Ordering::SeqCst);
        let confirmed = confirm_appointment(&state, created.id.clone()).await.unwrap();
        assert_eq!(confirmed.appointment.status, "Confirmed");
        assert!(matches!(confirmed.notification, DeliveryDto::Failed { .. }));

        let id = AppointmentId::from_str(&created.id).unwrap();
        let stored = store.get_appointment(id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        let owner = UserId::new("alice");
        assert!(store.list_notifications(&owner).await.unwrap().is_empty());

        store.fail_notifications.store(false, Ordering::SeqCst);
        let retried = notifications::retry_confirmation_notice(&state, created.id.clone())
            .await
            .unwrap();
        assert!(matches!(retried, DeliveryDto::Sent { .. }));
        assert_eq!(store.list_notifications(&owner).await.unwrap().len(), 1);
        assert_eq!(store.notification_writes.load(Ordering::SeqCst), 1);
    }
}
