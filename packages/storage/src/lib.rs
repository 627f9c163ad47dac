// ABOUTME: Settings store contract for sysconf
// ABOUTME: Storage trait, error types and the in-memory and SQLite backends

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::collections::HashMap;
use sysconf_core::{
    AuditEntry, BulkUpdateResult, Category, NewAuditEntry, Setting, SettingType, SettingUpdateItem,
    SettingValue,
};
use thiserror::Error;

pub use memory::InMemorySettingsStore;
pub use sqlite::SqliteSettingsStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Setting not found: {0}")]
    NotFound(String),
    #[error("Setting {key} expects {expected} value, got {actual}")]
    TypeMismatch {
        key: String,
        expected: SettingType,
        actual: SettingType,
    },
    #[error("Setting {0} must hold a finite number")]
    NonFiniteNumber(String),
    #[error("Settings store unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Everything a store returns from a listing
#[derive(Debug, Clone, Default)]
pub struct SettingsSnapshot {
    pub settings: HashMap<String, Setting>,
    pub categories: Vec<Category>,
}

/// Persistence contract consumed by the settings manager.
///
/// Implementations persist settings and append-only audit entries. Bulk
/// writes report success or failure per key; one failing key must not
/// prevent the others from being written.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// List settings, optionally restricted to one category
    async fn list(&self, category: Option<&str>) -> StorageResult<SettingsSnapshot>;

    async fn get(&self, key: &str) -> StorageResult<Option<Setting>>;

    /// Write a single value, returning the stored setting
    async fn write(
        &self,
        key: &str,
        value: &SettingValue,
        changed_by: &str,
    ) -> StorageResult<Setting>;

    /// Write several values independently. When `reason` is given every
    /// successful key also gets an audit entry.
    async fn write_many(
        &self,
        updates: &[SettingUpdateItem],
        changed_by: &str,
        reason: Option<&str>,
    ) -> StorageResult<BulkUpdateResult>;

    async fn append_audit(&self, entry: NewAuditEntry) -> StorageResult<AuditEntry>;

    /// Audit entries, newest first
    async fn list_audit(&self, setting_key: Option<&str>) -> StorageResult<Vec<AuditEntry>>;
}

/// Reject writes whose value kind differs from the stored setting's type,
/// and numbers that would not survive a JSON round trip
pub(crate) fn check_value_type(existing: &Setting, value: &SettingValue) -> StorageResult<()> {
    let expected = existing.setting_type();
    let actual = value.setting_type();

    if expected != actual {
        return Err(StorageError::TypeMismatch {
            key: existing.key.clone(),
            expected,
            actual,
        });
    }

    if let SettingValue::Number(n) = value {
        if !n.is_finite() {
            return Err(StorageError::NonFiniteNumber(existing.key.clone()));
        }
    }

    Ok(())
}

pub(crate) fn generate_audit_id() -> String {
    format!("audit-{}", nanoid::nanoid!(12))
}
