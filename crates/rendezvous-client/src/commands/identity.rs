use serde::Serialize;
use tracing::info;

use crate::error::LifecycleError;
use crate::identity::{Session, UserProfile};
use crate::state::AppState;

use super::CommandResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub user_id: String,
    pub email: Option<String>,
    pub role: String,
}

impl From<Session> for SessionDto {
    fn from(s: Session) -> Self {
        Self {
            user_id: s.user_id.to_string(),
            email: s.email,
            role: s.role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub role: Option<String>,
}

impl From<UserProfile> for ProfileDto {
    fn from(p: UserProfile) -> Self {
        Self {
            user_id: p.user_id.to_string(),
            email: p.email,
            display_name: p.display_name,
            role: p.role.map(|r| r.as_str().to_string()),
        }
    }
}

/// Create the identity record for the principal the provider reports, then
/// sign it in.
pub async fn sign_up(state: &AppState, display_name: Option<String>) -> CommandResult<SessionDto> {
    let principal = state
        .identity
        .current_principal()
        .await
        .ok_or(LifecycleError::NotAuthenticated)?;

    state.resolver.register(&principal, display_name).await?;
    sign_in(state).await
}

pub async fn sign_in(state: &AppState) -> CommandResult<SessionDto> {
    let session = state.resolver.sign_in(state.identity.as_ref()).await?;
    *state.session.write().await = Some(session.clone());
    Ok(session.into())
}

pub async fn sign_out(state: &AppState) -> CommandResult<()> {
    if let Some(session) = state.session.write().await.take() {
        info!(user = %session.user_id.short(), "signed out");
    }
    Ok(())
}

pub async fn current_session(state: &AppState) -> CommandResult<Option<SessionDto>> {
    Ok(state.session.read().await.clone().map(SessionDto::from))
}

pub async fn get_profile(state: &AppState) -> CommandResult<ProfileDto> {
    let session = state.require_session().await?;
    Ok(state.resolver.profile(&session).await?.into())
}

pub async fn update_display_name(
    state: &AppState,
    display_name: String,
) -> CommandResult<ProfileDto> {
    let session = state.require_session().await?;
    Ok(state
        .resolver
        .update_display_name(&session, &display_name)
        .await?
        .into())
}
