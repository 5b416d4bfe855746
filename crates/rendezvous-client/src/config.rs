//! Client configuration loaded from environment variables.
//!
//! Every setting has a default, so an embedding host can start with no
//! configuration at all.

use std::path::PathBuf;

use rendezvous_shared::constants::DEFAULT_NOTIFY_QUEUE;
use rendezvous_shared::identity::StaffAllowList;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SQLite file to open.
    /// Env: `RENDEZVOUS_DB_PATH`
    /// Default: platform data directory (see `Database::new`).
    pub db_path: Option<PathBuf>,

    /// Emails that register with the `staff` role, comma-separated.
    /// Env: `RENDEZVOUS_STAFF_EMAILS`
    /// Default: empty (everyone registers as a student).
    pub staff_emails: StaffAllowList,

    /// Write confirmation notices on a background task instead of inline.
    /// Env: `RENDEZVOUS_NOTIFY_BACKGROUND` (true/false)
    /// Default: `false`
    pub background_notifications: bool,

    /// Capacity of the background notification queue.
    /// Env: `RENDEZVOUS_NOTIFY_QUEUE`
    /// Default: `64`
    pub notify_queue_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            staff_emails: StaffAllowList::default(),
            background_notifications: false,
            notify_queue_capacity: DEFAULT_NOTIFY_QUEUE,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("RENDEZVOUS_DB_PATH") {
            if !path.trim().is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(csv) = lookup("RENDEZVOUS_STAFF_EMAILS") {
            config.staff_emails = StaffAllowList::from_csv(&csv);
        }

        if let Some(val) = lookup("RENDEZVOUS_NOTIFY_BACKGROUND") {
            config.background_notifications = val == "true" || val == "1";
        }

        if let Some(val) = lookup("RENDEZVOUS_NOTIFY_QUEUE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.notify_queue_capacity = n,
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid RENDEZVOUS_NOTIFY_QUEUE, using default"
                    );
                }
            }
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(pairs: &[(&str, &str)]) -> ClientConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.db_path.is_none());
        assert!(config.staff_emails.is_empty());
        assert!(!config.background_notifications);
        assert_eq!(config.notify_queue_capacity, 64);
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("RENDEZVOUS_DB_PATH", "/tmp/r.db"),
            ("RENDEZVOUS_STAFF_EMAILS", "a@x.edu, B@x.edu"),
            ("RENDEZVOUS_NOTIFY_BACKGROUND", "true"),
            ("RENDEZVOUS_NOTIFY_QUEUE", "8"),
        ]);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/r.db")));
        assert!(config.staff_emails.contains("b@x.edu"));
        assert_eq!(config.staff_emails.len(), 2);
        assert!(config.background_notifications);
        assert_eq!(config.notify_queue_capacity, 8);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_map(&[
            ("RENDEZVOUS_DB_PATH", "  "),
            ("RENDEZVOUS_NOTIFY_QUEUE", "zero"),
            ("RENDEZVOUS_NOTIFY_BACKGROUND", "yes please"),
        ]);
        assert!(config.db_path.is_none());
        assert_eq!(config.notify_queue_capacity, 64);
        assert!(!config.background_notifications);

        assert_eq!(
            from_map(&[("RENDEZVOUS_NOTIFY_QUEUE", "0")]).notify_queue_capacity,
            64
        );
    }
}
