//! # rendezvous-client
//!
//! The appointment core: identity resolution, the appointment lifecycle,
//! confirmation notices and letter export, plus the command layer a UI
//! drives them through.

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod identity;
pub mod lifecycle;
pub mod notify;
pub mod state;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::{ErrorKind, LifecycleError};
pub use state::AppState;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Calling this more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("rendezvous_client=debug,rendezvous_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
