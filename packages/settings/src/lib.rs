// ABOUTME: System settings module
// ABOUTME: Settings manager with validation-gated writes, unsaved-change tracking and audit

pub mod config;
pub mod error;
pub mod events;
pub mod manager;

pub use config::{ConfigError, ManagerConfig};
pub use error::{SettingsError, SettingsResult};
pub use events::SettingsEvent;
pub use manager::SettingsManager;

// Re-export the model so callers need a single dependency
pub use sysconf_core::{
    AuditEntry, Category, ChangeTracker, ExpirySweeper, PendingChange, Setting, SettingType,
    SettingUpdateItem, SettingValue, SettingsRegistry, TrackerConfig, ValidationError,
    ValidationRule,
};
pub use sysconf_storage::{InMemorySettingsStore, SettingsStore, SqliteSettingsStore};
