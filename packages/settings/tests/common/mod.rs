// ABOUTME: Shared fixtures for settings manager tests
// ABOUTME: Sample registry and a store wrapper that injects failures

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysconf_core::{
    AuditEntry, BulkUpdateResult, Category, KeyError, NewAuditEntry, Setting, SettingUpdateItem,
    SettingValue, SettingsRegistry, ValidationRule,
};
use sysconf_settings::{ManagerConfig, SettingsManager};
use sysconf_storage::{
    InMemorySettingsStore, SettingsSnapshot, SettingsStore, StorageError, StorageResult,
};

pub fn registry() -> SettingsRegistry {
    SettingsRegistry::new(
        vec![
            Setting::new(
                "system.name",
                "system",
                "System Name",
                SettingValue::String("primary".into()),
            )
            .with_validation(ValidationRule {
                required: true,
                min: Some(1.0),
                max: Some(100.0),
                ..Default::default()
            }),
            Setting::new(
                "system.maintenance_mode",
                "system",
                "Maintenance Mode",
                SettingValue::Boolean(false),
            ),
            Setting::new(
                "system.log_level",
                "system",
                "Log Level",
                SettingValue::Select("info".into()),
            )
            .with_validation(ValidationRule {
                options: Some(vec!["debug".into(), "info".into(), "warn".into()]),
                ..Default::default()
            }),
            Setting::new(
                "performance.max_streams",
                "performance",
                "Max Streams",
                SettingValue::Number(100.0),
            )
            .with_validation(ValidationRule {
                required: true,
                min: Some(1.0),
                max: Some(1000.0),
                ..Default::default()
            }),
        ],
        vec![
            Category {
                id: "system".into(),
                name: "System".into(),
                description: "General system settings".into(),
                icon: Some("settings".into()),
            },
            Category {
                id: "performance".into(),
                name: "Performance".into(),
                description: "Throughput limits".into(),
                icon: None,
            },
        ],
    )
    .unwrap()
}

/// Store that delegates to an in-memory store unless told to fail
pub struct FlakyStore {
    inner: InMemorySettingsStore,
    pub fail_list: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_audit: AtomicBool,
    pub fail_list_audit: AtomicBool,
    /// Keys `write_many` reports as failed
    pub rejected_keys: Mutex<HashSet<String>>,
    pub delay: Mutex<Option<Duration>>,
    pub write_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(registry: SettingsRegistry) -> Self {
        Self {
            inner: InMemorySettingsStore::new(registry),
            fail_list: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_audit: AtomicBool::new(false),
            fail_list_audit: AtomicBool::new(false),
            rejected_keys: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
            write_calls: AtomicUsize::new(0),
        }
    }

    pub fn reject_key(&self, key: &str) {
        self.rejected_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn unavailable() -> StorageError {
    StorageError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl SettingsStore for FlakyStore {
    async fn list(&self, category: Option<&str>) -> StorageResult<SettingsSnapshot> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.list(category).await
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Setting>> {
        self.inner.get(key).await
    }

    async fn write(
        &self,
        key: &str,
        value: &SettingValue,
        changed_by: &str,
    ) -> StorageResult<Setting> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.write(key, value, changed_by).await
    }

    async fn write_many(
        &self,
        updates: &[SettingUpdateItem],
        changed_by: &str,
        reason: Option<&str>,
    ) -> StorageResult<BulkUpdateResult> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let rejected = self.rejected_keys.lock().unwrap().clone();
        let (accepted, refused): (Vec<_>, Vec<_>) = updates
            .iter()
            .cloned()
            .partition(|u| !rejected.contains(&u.key));

        let mut result = self.inner.write_many(&accepted, changed_by, reason).await?;
        result.errors.extend(refused.into_iter().map(|u| KeyError {
            key: u.key,
            error: "write rejected by store".to_string(),
        }));
        Ok(result)
    }

    async fn append_audit(&self, entry: NewAuditEntry) -> StorageResult<AuditEntry> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.append_audit(entry).await
    }

    async fn list_audit(&self, setting_key: Option<&str>) -> StorageResult<Vec<AuditEntry>> {
        if self.fail_list_audit.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.list_audit(setting_key).await
    }
}

pub async fn setup() -> (Arc<FlakyStore>, SettingsManager) {
    setup_with(ManagerConfig::default().with_changed_by("admin")).await
}

pub async fn setup_with(config: ManagerConfig) -> (Arc<FlakyStore>, SettingsManager) {
    let store = Arc::new(FlakyStore::new(registry()));
    let manager = SettingsManager::load(store.clone(), config).await.unwrap();
    (store, manager)
}
