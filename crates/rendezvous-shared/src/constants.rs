/// Application name
pub const APP_NAME: &str = "Rendezvous";

/// Display name stored when the auth provider has none
pub const DEFAULT_DISPLAY_NAME: &str = "N/A";

/// Calendar date format used on the wire and in rendered text
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time-of-day format used on the wire and in rendered text
pub const TIME_FORMAT: &str = "%H:%M";

/// Export document heading
pub const EXPORT_TITLE: &str = "Appointment Letter";

/// Export document footer
pub const EXPORT_FOOTER: &str = "Status: Confirmed";

/// Default database file name inside the platform data directory
pub const DB_FILE_NAME: &str = "rendezvous.db";

/// Default capacity of the notification worker queue
pub const DEFAULT_NOTIFY_QUEUE: usize = 64;
