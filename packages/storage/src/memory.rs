// ABOUTME: In-memory settings store
// ABOUTME: Process-local backend for embedding and tests, seeded from a registry

use crate::{
    check_value_type, generate_audit_id, SettingsSnapshot, SettingsStore, StorageError,
    StorageResult,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use sysconf_core::{
    AuditEntry, BulkUpdateResult, Category, KeyError, NewAuditEntry, Setting, SettingUpdateItem,
    SettingValue, SettingsRegistry,
};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct MemoryState {
    settings: HashMap<String, Setting>,
    categories: Vec<Category>,
    audit: Vec<AuditEntry>,
}

impl MemoryState {
    fn write(&mut self, key: &str, value: &SettingValue, changed_by: &str) -> StorageResult<Setting> {
        let setting = self
            .settings
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        check_value_type(setting, value)?;

        setting.value = value.clone();
        setting.updated_at = Some(Utc::now());
        setting.updated_by = Some(changed_by.to_string());
        Ok(setting.clone())
    }

    fn append_audit(&mut self, entry: NewAuditEntry) -> AuditEntry {
        let entry = AuditEntry {
            id: generate_audit_id(),
            setting_key: entry.setting_key,
            old_value: entry.old_value,
            new_value: entry.new_value,
            changed_by: entry.changed_by,
            changed_at: Utc::now(),
            reason: entry.reason,
        };
        self.audit.push(entry.clone());
        entry
    }
}

pub struct InMemorySettingsStore {
    state: RwLock<MemoryState>,
}

impl InMemorySettingsStore {
    pub fn new(registry: SettingsRegistry) -> Self {
        let (settings, categories) = registry.into_parts();
        Self {
            state: RwLock::new(MemoryState {
                settings,
                categories,
                audit: Vec::new(),
            }),
        }
    }

    pub fn empty() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn list(&self, category: Option<&str>) -> StorageResult<SettingsSnapshot> {
        let state = self.state.read().await;

        let settings = state
            .settings
            .iter()
            .filter(|(_, s)| category.map_or(true, |c| s.category == c))
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();

        let categories = state
            .categories
            .iter()
            .filter(|c| category.map_or(true, |id| c.id == id))
            .cloned()
            .collect();

        Ok(SettingsSnapshot {
            settings,
            categories,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Setting>> {
        Ok(self.state.read().await.settings.get(key).cloned())
    }

    async fn write(
        &self,
        key: &str,
        value: &SettingValue,
        changed_by: &str,
    ) -> StorageResult<Setting> {
        self.state.write().await.write(key, value, changed_by)
    }

    async fn write_many(
        &self,
        updates: &[SettingUpdateItem],
        changed_by: &str,
        reason: Option<&str>,
    ) -> StorageResult<BulkUpdateResult> {
        let mut state = self.state.write().await;
        let mut result = BulkUpdateResult::default();

        for item in updates {
            let old_value = state.settings.get(&item.key).map(|s| s.value.clone());

            match state.write(&item.key, &item.value, changed_by) {
                Ok(_) => {
                    if let Some(reason) = reason {
                        state.append_audit(NewAuditEntry {
                            setting_key: item.key.clone(),
                            old_value,
                            new_value: item.value.clone(),
                            changed_by: changed_by.to_string(),
                            reason: Some(reason.to_string()),
                        });
                    }
                    result.updated.push(item.clone());
                }
                Err(e) => {
                    debug!("Bulk write rejected {}: {}", item.key, e);
                    result.errors.push(KeyError {
                        key: item.key.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    async fn append_audit(&self, entry: NewAuditEntry) -> StorageResult<AuditEntry> {
        Ok(self.state.write().await.append_audit(entry))
    }

    async fn list_audit(&self, setting_key: Option<&str>) -> StorageResult<Vec<AuditEntry>> {
        let state = self.state.read().await;

        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|e| setting_key.map_or(true, |k| e.setting_key == k))
            .cloned()
            .collect())
    }
}
