//! # rendezvous-demo
//!
//! Walks one appointment through its whole life from the command layer:
//! a student requests it, staff confirm it, the student reads the notice and
//! exports the letter.
//!
//! Uses an in-memory database unless `RENDEZVOUS_DB_PATH` is set.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use rendezvous_client::commands::{appointments, identity, notifications};
use rendezvous_client::identity::StaticIdentity;
use rendezvous_client::{init_tracing, AppState, ClientConfig};
use rendezvous_shared::constants::APP_NAME;
use rendezvous_shared::identity::{Principal, StaffAllowList};
use rendezvous_store::SqliteStore;

const STUDENT_EMAIL: &str = "student@campus.example";
const STAFF_EMAIL: &str = "registrar@campus.example";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting {APP_NAME} demo v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ClientConfig::from_env();
    if config.staff_emails.is_empty() {
        config.staff_emails = StaffAllowList::new([STAFF_EMAIL]);
    }

    let provider = Arc::new(StaticIdentity::default());
    let state = if config.db_path.is_some() {
        AppState::open(config, provider.clone())?
    } else {
        let store = Arc::new(SqliteStore::open_in_memory()?);
        AppState::with_store(config, store, provider.clone())
    };

    let mut events = state.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(event = event.name(), "client event");
        }
    });

    // -----------------------------------------------------------------------
    // 1. Student signs up and requests an appointment
    // -----------------------------------------------------------------------
    let student = Principal::new("student-1", Some(STUDENT_EMAIL.to_string()));
    provider.set(student.clone());
    let session = sign_up_or_in(&state, "Sam Student").await?;
    info!(user = %session.user_id, role = %session.role, "student session");

    let created = appointments::create_appointment(
        &state,
        appointments::CreateAppointmentArgs {
            subject: "Course advising".to_string(),
            location: "Admin building, room 12".to_string(),
            attendees: "Academic advisor".to_string(),
            date: "2024-09-02".to_string(),
            time: "10:30".to_string(),
        },
    )
    .await?;
    info!(id = %created.id, status = %created.status, "requested");

    // -----------------------------------------------------------------------
    // 2. Staff confirm it
    // -----------------------------------------------------------------------
    identity::sign_out(&state).await?;
    provider.set(Principal::new("staff-1", Some(STAFF_EMAIL.to_string())));
    let session = sign_up_or_in(&state, "Registrar").await?;
    info!(user = %session.user_id, role = %session.role, "staff session");

    let confirmed = appointments::confirm_appointment(&state, created.id.clone()).await?;
    info!(
        status = %confirmed.appointment.status,
        notice = ?confirmed.notification,
        "confirmed"
    );

    // -----------------------------------------------------------------------
    // 3. Student reads the notice and exports the letter
    // -----------------------------------------------------------------------
    identity::sign_out(&state).await?;
    provider.set(student);
    identity::sign_in(&state).await?;

    for notice in notifications::list_notifications(&state).await? {
        info!(read_state = %notice.read_state, "{}", notice.message);
        notifications::mark_notification_read(&state, notice.id).await?;
    }

    let export = appointments::export_appointment(&state, created.id).await?;
    info!(file = %export.file_name, "letter ready");
    println!("{}", export.text);

    state.shutdown().await;
    Ok(())
}

/// Sign in, registering the principal first when it has no record yet.
async fn sign_up_or_in(
    state: &AppState,
    display_name: &str,
) -> anyhow::Result<identity::SessionDto> {
    match identity::sign_in(state).await {
        Ok(session) => Ok(session),
        Err(_) => identity::sign_up(state, Some(display_name.to_string()))
            .await
            .context("sign-up failed"),
    }
}
