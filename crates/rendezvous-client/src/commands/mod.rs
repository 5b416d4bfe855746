//! Command handlers for the embedding UI layer.
//!
//! Each sub-module groups related commands by domain. Handlers take the
//! shared [`AppState`](crate::state::AppState), accept string-typed
//! arguments as a UI would send them, and answer with camelCase DTOs.

pub mod appointments;
pub mod identity;
pub mod notifications;

use std::fmt;

use serde::Serialize;

use crate::error::{ErrorKind, LifecycleError};

/// Error payload returned by every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<LifecycleError> for CommandError {
    fn from(e: LifecycleError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// Malformed argument from the UI.
pub(crate) fn invalid_input(e: impl fmt::Display) -> CommandError {
    LifecycleError::Validation(e.to_string()).into()
}
