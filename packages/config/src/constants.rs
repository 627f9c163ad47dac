// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across sysconf

// Settings Manager
pub const SYSCONF_STORE_TIMEOUT_SECS: &str = "SYSCONF_STORE_TIMEOUT_SECS";
pub const SYSCONF_CHANGED_BY: &str = "SYSCONF_CHANGED_BY";
pub const SYSCONF_EVENT_CHANNEL_SIZE: &str = "SYSCONF_EVENT_CHANNEL_SIZE";

// Change Tracker
pub const SYSCONF_PENDING_RETENTION_SECS: &str = "SYSCONF_PENDING_RETENTION_SECS";
pub const SYSCONF_SWEEP_INTERVAL_SECS: &str = "SYSCONF_SWEEP_INTERVAL_SECS";

// Storage
pub const SYSCONF_DATABASE_URL: &str = "SYSCONF_DATABASE_URL";
