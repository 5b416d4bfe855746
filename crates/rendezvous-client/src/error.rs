use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rendezvous_shared::types::{AppointmentStatus, UserId};
use rendezvous_store::StoreError;

use crate::notify::NotificationRequest;

/// A status-changing or status-gated operation on an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Confirm,
    Cancel,
    Export,
    Edit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Export => "export",
            Self::Edit => "edit",
        })
    }
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Role or ownership check failed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The record exists but its status does not allow the action.
    #[error("Cannot {action} an appointment that is {from}")]
    InvalidTransition {
        action: Action,
        from: AppointmentStatus,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Only confirmed appointments can be exported (status is {0})")]
    NotConfirmed(AppointmentStatus),

    #[error("Input rejected: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The identity record itself is missing; the user must sign in again.
    #[error("No identity record for user {0}")]
    RoleNotFound(UserId),

    #[error("No authenticated principal")]
    NotAuthenticated,

    #[error("User {0} is already registered")]
    AlreadyRegistered(UserId),

    /// The transition was applied but its notification could not be written.
    #[error(
        "Appointment {} confirmed but notifying {} failed: {source}",
        .request.appointment_id,
        .request.target_user_id
    )]
    NotificationFailed {
        request: Box<NotificationRequest>,
        #[source]
        source: StoreError,
    },
}

/// How a UI should treat a failure: the retry affordance differs per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// "You are not allowed."
    NotAllowed,
    /// "This action no longer makes sense."
    NoLongerApplicable,
    /// "The backend is unreachable."
    BackendUnreachable,
}

impl LifecycleError {
    pub(crate) fn appointment_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "Appointment",
            id: id.to_string(),
        }
    }

    pub(crate) fn notification_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            kind: "Notification",
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden(_) | Self::RoleNotFound(_) | Self::NotAuthenticated => {
                ErrorKind::NotAllowed
            }
            Self::InvalidTransition { .. }
            | Self::NotFound { .. }
            | Self::NotConfirmed(_)
            | Self::Validation(_)
            | Self::AlreadyRegistered(_) => ErrorKind::NoLongerApplicable,
            Self::StoreUnavailable(_) | Self::NotificationFailed { .. } => {
                ErrorKind::BackendUnreachable
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
