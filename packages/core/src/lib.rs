// ABOUTME: Core types, validation and change tracking for sysconf
// ABOUTME: Storage-independent foundation shared by the store and the settings manager

pub mod registry;
pub mod tracker;
pub mod types;
pub mod validation;

// Re-export main types
pub use types::{
    AuditEntry, BulkUpdateResult, Category, KeyError, NewAuditEntry, PendingChange, Setting,
    SettingType, SettingUpdateItem, SettingValue, ValidationRule,
};

pub use registry::{RegistryError, SettingsRegistry};

pub use tracker::{ChangeTracker, ExpirySweeper, SharedChangeTracker, TrackerConfig};

// Re-export validation
pub use validation::{
    validate_multiple, validate_setting_value, ValidationError, ValidationErrorKind,
};
