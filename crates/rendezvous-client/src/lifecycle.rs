//! Appointment lifecycle: the status state machine and its authorization gate.
//!
//! | Transition | Actor           | From        | Effect                              |
//! |------------|-----------------|-------------|-------------------------------------|
//! | create     | student         | -           | new record, `Pending`               |
//! | confirm    | staff           | `Pending`   | `Confirmed` + notification request  |
//! | cancel     | owning student  | `Upcoming`  | record deleted                      |
//! | export     | owning student  | `Confirmed` | letter payload, no status change    |
//!
//! Nothing moves a record into `Upcoming`; only records already carrying
//! that status (seed or legacy data) can be cancelled.
//!
//! Each transition is one conditional write at the store. When the write
//! matches nothing the record is re-read to report why.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rendezvous_shared::types::{AppointmentId, AppointmentStatus, UserId};
use rendezvous_store::{Appointment, AppointmentStore, DetailsUpdate, NewAppointment};

use crate::error::{Action, LifecycleError, Result};
use crate::export::{self, ExportDocument};
use crate::identity::Session;
use crate::notify::NotificationRequest;

/// Fields a student fills in when requesting an appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub subject: String,
    pub location: String,
    pub attendees: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Requested edit. `owner_user_id` exists so that an attempt to reassign
/// ownership can be rejected rather than silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentPatch {
    pub subject: Option<String>,
    pub location: Option<String>,
    pub attendees: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub owner_user_id: Option<UserId>,
}

/// Result of a successful confirm: the updated record plus the notice that
/// still has to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedTransition {
    pub appointment: Appointment,
    pub notification: NotificationRequest,
}

/// What the caller may do with an appointment right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedActions {
    pub can_confirm: bool,
    pub can_cancel: bool,
    pub can_export: bool,
    pub can_edit: bool,
}

pub fn allowed_actions(session: &Session, appointment: &Appointment) -> AllowedActions {
    let owns = session.is_student() && appointment.owner_user_id == session.user_id;
    AllowedActions {
        can_confirm: session.is_staff() && appointment.status == AppointmentStatus::Pending,
        can_cancel: owns && appointment.status == AppointmentStatus::Upcoming,
        can_export: owns && appointment.status == AppointmentStatus::Confirmed,
        can_edit: owns && appointment.status == AppointmentStatus::Pending,
    }
}

#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn AppointmentStore>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Staff see every appointment; students see only their own.
    pub async fn list(&self, session: &Session) -> Result<Vec<Appointment>> {
        if session.is_staff() {
            return Ok(self.store.list_appointments(None).await?);
        }

        let mut appointments = self.store.list_appointments(Some(&session.user_id)).await?;
        // The adapter filter is advisory; visibility is enforced here.
        appointments.retain(|a| a.owner_user_id == session.user_id);
        Ok(appointments)
    }

    pub async fn get(&self, session: &Session, id: AppointmentId) -> Result<Appointment> {
        let appointment = self.load(id).await?;
        if !session.is_staff() && appointment.owner_user_id != session.user_id {
            return Err(LifecycleError::Forbidden(
                "appointment belongs to another student".into(),
            ));
        }
        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    pub async fn create(&self, session: &Session, draft: AppointmentDraft) -> Result<Appointment> {
        if !session.is_student() {
            return Err(LifecycleError::Forbidden(
                "only students can request appointments".into(),
            ));
        }

        let subject = draft.subject.trim();
        if subject.is_empty() {
            return Err(LifecycleError::Validation("subject must not be empty".into()));
        }

        let appointment = self
            .store
            .insert_appointment(&NewAppointment {
                owner_user_id: session.user_id.clone(),
                subject: subject.to_string(),
                location: draft.location.trim().to_string(),
                attendees: draft.attendees.trim().to_string(),
                date: draft.date,
                time: draft.time,
                status: AppointmentStatus::Pending,
            })
            .await?;

        info!(
            appointment = %appointment.id,
            owner = %session.user_id.short(),
            date = %appointment.date,
            "appointment requested"
        );
        Ok(appointment)
    }

    /// Staff approval of a pending request.
    pub async fn confirm(
        &self,
        session: &Session,
        id: AppointmentId,
    ) -> Result<ConfirmedTransition> {
        if !session.is_staff() {
            return Err(LifecycleError::Forbidden(
                "only staff can confirm appointments".into(),
            ));
        }

        let mut appointment = self.load(id).await?;
        require_status(&appointment, AppointmentStatus::Pending, Action::Confirm)?;

        let applied = self
            .store
            .transition_status(id, AppointmentStatus::Pending, AppointmentStatus::Confirmed)
            .await?;
        if !applied {
            return Err(self.explain_miss(id, Action::Confirm).await);
        }

        appointment.status = AppointmentStatus::Confirmed;
        info!(
            appointment = %id,
            by = %session.user_id.short(),
            owner = %appointment.owner_user_id.short(),
            "appointment confirmed"
        );

        let notification = NotificationRequest::confirmed(&appointment);
        Ok(ConfirmedTransition {
            appointment,
            notification,
        })
    }

    /// Owner cancellation. Removes the record; returns what was removed.
    pub async fn cancel(&self, session: &Session, id: AppointmentId) -> Result<Appointment> {
        require_student(session, Action::Cancel)?;
        let appointment = self.load(id).await?;
        require_owner(session, &appointment, Action::Cancel)?;
        require_status(&appointment, AppointmentStatus::Upcoming, Action::Cancel)?;

        let deleted = self
            .store
            .delete_appointment_if_status(id, AppointmentStatus::Upcoming)
            .await?;
        if !deleted {
            return Err(self.explain_miss(id, Action::Cancel).await);
        }

        info!(appointment = %id, owner = %session.user_id.short(), "appointment cancelled");
        Ok(appointment)
    }

    /// Letter payload for the owner of a confirmed appointment.
    pub async fn export(&self, session: &Session, id: AppointmentId) -> Result<ExportDocument> {
        require_student(session, Action::Export)?;
        let appointment = self.load(id).await?;
        require_owner(session, &appointment, Action::Export)?;

        let document = export::prepare(&appointment)?;
        debug!(appointment = %id, "export prepared");
        Ok(document)
    }

    /// Rebuild the confirmation notice for an already confirmed appointment,
    /// so a failed notification write can be attempted again.
    pub async fn confirmation_notice(
        &self,
        session: &Session,
        id: AppointmentId,
    ) -> Result<NotificationRequest> {
        if !session.is_staff() {
            return Err(LifecycleError::Forbidden(
                "only staff can resend confirmation notices".into(),
            ));
        }

        let appointment = self.load(id).await?;
        if appointment.status != AppointmentStatus::Confirmed {
            return Err(LifecycleError::NotConfirmed(appointment.status));
        }
        Ok(NotificationRequest::confirmed(&appointment))
    }

    /// Owner edit of the descriptive fields while the request is pending.
    pub async fn update_details(
        &self,
        session: &Session,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> Result<Appointment> {
        if patch.owner_user_id.is_some() {
            return Err(LifecycleError::Forbidden(
                "appointment owner cannot be changed".into(),
            ));
        }
        require_student(session, Action::Edit)?;

        let appointment = self.load(id).await?;
        require_owner(session, &appointment, Action::Edit)?;
        require_status(&appointment, AppointmentStatus::Pending, Action::Edit)?;

        let subject = match patch.subject {
            Some(s) if s.trim().is_empty() => {
                return Err(LifecycleError::Validation("subject must not be empty".into()));
            }
            Some(s) => Some(s.trim().to_string()),
            None => None,
        };

        let update = DetailsUpdate {
            subject,
            location: patch.location.map(|s| s.trim().to_string()),
            attendees: patch.attendees.map(|s| s.trim().to_string()),
            date: patch.date,
            time: patch.time,
        };
        if update.is_empty() {
            return Ok(appointment);
        }

        let applied = self
            .store
            .update_appointment_details(id, AppointmentStatus::Pending, &update)
            .await?;
        if !applied {
            return Err(self.explain_miss(id, Action::Edit).await);
        }

        info!(appointment = %id, "appointment details updated");
        self.load(id).await
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn load(&self, id: AppointmentId) -> Result<Appointment> {
        self.store
            .get_appointment(id)
            .await?
            .ok_or_else(|| LifecycleError::appointment_not_found(id))
    }

    /// A conditional write matched nothing: work out whether the record is
    /// gone or has moved on.
    async fn explain_miss(&self, id: AppointmentId, action: Action) -> LifecycleError {
        match self.store.get_appointment(id).await {
            Ok(Some(current)) => {
                debug!(
                    appointment = %id,
                    status = %current.status,
                    %action,
                    "lost transition race"
                );
                LifecycleError::InvalidTransition {
                    action,
                    from: current.status,
                }
            }
            Ok(None) => LifecycleError::appointment_not_found(id),
            Err(e) => e.into(),
        }
    }
}

fn require_student(session: &Session, action: Action) -> Result<()> {
    if session.is_student() {
        return Ok(());
    }
    Err(LifecycleError::Forbidden(format!(
        "only students can {action} appointments"
    )))
}

fn require_owner(session: &Session, appointment: &Appointment, action: Action) -> Result<()> {
    if session.is_student() && appointment.owner_user_id == session.user_id {
        return Ok(());
    }
    Err(LifecycleError::Forbidden(format!(
        "only the owning student can {action} this appointment"
    )))
}

fn require_status(
    appointment: &Appointment,
    expected: AppointmentStatus,
    action: Action,
) -> Result<()> {
    if appointment.status == expected {
        return Ok(());
    }
    Err(LifecycleError::InvalidTransition {
        action,
        from: appointment.status,
    })
}
