//! Application state shared across all command handlers.
//!
//! [`AppState`] owns the store handle and every component built on top of
//! it. Components are cheap handles over the same `Arc<dyn AppointmentStore>`,
//! so the state itself can be shared behind a plain `Arc`.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use rendezvous_store::{AppointmentStore, Database, SqliteStore};

use crate::config::ClientConfig;
use crate::error::{LifecycleError, Result};
use crate::events::{ClientEvent, EventSender};
use crate::identity::{IdentityProvider, IdentityResolver, Session};
use crate::lifecycle::LifecycleEngine;
use crate::notify::{
    spawn_notification_worker, NotificationEmitter, NotificationInbox, NotificationQueue,
};

const EVENT_BUFFER: usize = 128;

/// Central application state.
pub struct AppState {
    pub config: ClientConfig,

    /// Where authenticated principals come from.
    pub identity: Arc<dyn IdentityProvider>,

    pub resolver: IdentityResolver,
    pub lifecycle: LifecycleEngine,
    pub emitter: NotificationEmitter,
    pub inbox: NotificationInbox,

    /// Present when confirmation notices are written in the background.
    pub notification_queue: Option<NotificationQueue>,
    notification_worker: Option<JoinHandle<()>>,

    pub events: EventSender,

    /// The signed-in user. `None` until `sign_in` succeeds.
    pub session: RwLock<Option<Session>>,
}

impl AppState {
    /// Open the configured SQLite file (or the platform default) and build
    /// the state on top of it.
    pub fn open(
        config: ClientConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> rendezvous_store::Result<Self> {
        let db = match &config.db_path {
            Some(path) => Database::open_at(path)?,
            None => Database::new()?,
        };
        if let Some(path) = db.path() {
            info!(path = %path.display(), "database opened");
        }

        let store: Arc<dyn AppointmentStore> = Arc::new(SqliteStore::new(db));
        Ok(Self::with_store(config, store, identity))
    }

    /// Build the state over an existing store.
    ///
    /// Background notifications need a running Tokio runtime; without one
    /// the state falls back to inline delivery.
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn AppointmentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let emitter = NotificationEmitter::new(store.clone());

        let (notification_queue, notification_worker) = if config.background_notifications {
            if tokio::runtime::Handle::try_current().is_ok() {
                let (queue, handle) = spawn_notification_worker(
                    emitter.clone(),
                    events.clone(),
                    config.notify_queue_capacity,
                );
                (Some(queue), Some(handle))
            } else {
                warn!("no Tokio runtime, delivering notifications inline");
                (None, None)
            }
        } else {
            (None, None)
        };

        Self {
            resolver: IdentityResolver::new(store.clone(), config.staff_emails.clone()),
            lifecycle: LifecycleEngine::new(store.clone()),
            inbox: NotificationInbox::new(store),
            emitter,
            notification_queue,
            notification_worker,
            events,
            identity,
            config,
            session: RwLock::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// The current session, or `NotAuthenticated`.
    pub async fn require_session(&self) -> Result<Session> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(LifecycleError::NotAuthenticated)
    }

    /// Close the notification queue and wait for queued notices to be
    /// written.
    pub async fn shutdown(mut self) {
        self.notification_queue = None;
        if let Some(handle) = self.notification_worker.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "notification worker ended abnormally");
            }
        }
    }
}
