// ABOUTME: Settings manager orchestrating validation, persistence and audit
// ABOUTME: Holds the in-memory settings and the last-fetched baseline used for unsaved-change tracking

use crate::config::ManagerConfig;
use crate::error::{SettingsError, SettingsResult};
use crate::events::SettingsEvent;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use sysconf_core::{
    validate_setting_value, AuditEntry, Category, ChangeTracker, NewAuditEntry, Setting,
    SettingUpdateItem, SettingValue, SettingsRegistry, ValidationError,
};
use sysconf_storage::{SettingsStore, StorageResult};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Stateful front door to the settings store.
///
/// Writes are persisted immediately. The baseline (`original_settings`) is
/// the state of the last fetch and only moves on [`refresh_settings`], so
/// after a successful update `has_unsaved_changes` reports true until the
/// next refresh or reset.
///
/// [`refresh_settings`]: SettingsManager::refresh_settings
pub struct SettingsManager {
    store: Arc<dyn SettingsStore>,
    config: ManagerConfig,
    settings: HashMap<String, Setting>,
    original_settings: HashMap<String, Setting>,
    categories: Vec<Category>,
    is_loading: bool,
    error: Option<String>,
    event_tx: broadcast::Sender<SettingsEvent>,
}

impl SettingsManager {
    pub fn new(store: Arc<dyn SettingsStore>, config: ManagerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_size.max(1));

        Self {
            store,
            config,
            settings: HashMap::new(),
            original_settings: HashMap::new(),
            categories: Vec::new(),
            is_loading: false,
            error: None,
            event_tx,
        }
    }

    /// Construct a manager and fetch the registry from the store
    pub async fn load(store: Arc<dyn SettingsStore>, config: ManagerConfig) -> SettingsResult<Self> {
        let mut manager = Self::new(store, config);
        manager.refresh_settings().await?;
        Ok(manager)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SettingsEvent> {
        self.event_tx.subscribe()
    }

    pub fn settings(&self) -> &HashMap<String, Setting> {
        &self.settings
    }

    pub fn setting(&self, key: &str) -> Option<&Setting> {
        self.settings.get(key)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Message of the last failed operation, cleared by the next success
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Fetch settings and categories and adopt them as the new baseline
    pub async fn refresh_settings(&mut self) -> SettingsResult<()> {
        debug!("Refreshing settings from store");
        self.is_loading = true;
        let result = self.fetch_registry().await;
        self.is_loading = false;

        match result {
            Ok(registry) => {
                let (settings, categories) = registry.into_parts();
                let count = settings.len();

                self.original_settings = settings.clone();
                self.settings = settings;
                self.categories = categories;
                self.error = None;

                info!("Loaded {} settings", count);
                self.emit(SettingsEvent::Loaded { count });
                Ok(())
            }
            Err(e) => {
                error!("Failed to load settings: {}", e);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_registry(&self) -> SettingsResult<SettingsRegistry> {
        let snapshot = self.call_store(self.store.list(None)).await?;
        Ok(SettingsRegistry::from_map(
            snapshot.settings,
            snapshot.categories,
        )?)
    }

    /// Validate, persist and apply a single value.
    ///
    /// An audit entry is appended only when `reason` is given; its old value
    /// is the baseline value, not the previous in-memory one.
    pub async fn update_setting(
        &mut self,
        key: &str,
        value: SettingValue,
        reason: Option<&str>,
    ) -> SettingsResult<()> {
        let setting = self
            .settings
            .get(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;

        validate_setting_value(setting, &value).map_err(|source| SettingsError::Validation {
            key: key.to_string(),
            source,
        })?;

        info!("Updating setting: {}", key);

        let written = self
            .call_store(self.store.write(key, &value, &self.config.changed_by))
            .await;

        let stored = match written {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to update setting {}: {}", key, e);
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        self.settings.insert(key.to_string(), stored);
        self.error = None;

        if let Some(reason) = reason {
            let entry = NewAuditEntry {
                setting_key: key.to_string(),
                old_value: self.original_settings.get(key).map(|s| s.value.clone()),
                new_value: value,
                changed_by: self.config.changed_by.clone(),
                reason: Some(reason.to_string()),
            };

            // Audit is observability only; a failure here never fails the update
            if let Err(e) = self.call_store(self.store.append_audit(entry)).await {
                warn!("Failed to record audit entry for {}: {}", key, e);
            }
        }

        self.emit(SettingsEvent::SettingUpdated {
            key: key.to_string(),
        });
        Ok(())
    }

    /// Validate every update, then write them as one batch.
    ///
    /// Any invalid entry aborts before the store is contacted. If the store
    /// rejects some keys, the accepted ones are still applied and a
    /// [`SettingsError::PartialBatchFailure`] lists the rest.
    pub async fn update_multiple_settings(
        &mut self,
        updates: &[SettingUpdateItem],
        reason: Option<&str>,
    ) -> SettingsResult<Vec<String>> {
        for item in updates {
            let setting = self
                .settings
                .get(&item.key)
                .ok_or_else(|| SettingsError::UnknownKey(item.key.clone()))?;

            validate_setting_value(setting, &item.value).map_err(|source| {
                SettingsError::Validation {
                    key: item.key.clone(),
                    source,
                }
            })?;
        }

        info!("Bulk updating {} settings", updates.len());

        let written = self
            .call_store(
                self.store
                    .write_many(updates, &self.config.changed_by, reason),
            )
            .await;

        let result = match written {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to bulk update settings: {}", e);
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        let now = Utc::now();
        let mut applied = Vec::with_capacity(result.updated.len());
        for item in result.updated {
            match self.settings.get_mut(&item.key) {
                Some(setting) => {
                    setting.value = item.value;
                    setting.updated_at = Some(now);
                    setting.updated_by = Some(self.config.changed_by.clone());
                    applied.push(item.key);
                }
                None => warn!("Store reported update for unknown setting {}", item.key),
            }
        }

        if !applied.is_empty() {
            self.emit(SettingsEvent::BatchUpdated {
                keys: applied.clone(),
            });
        }

        if result.errors.is_empty() {
            self.error = None;
            return Ok(applied);
        }

        let err = SettingsError::PartialBatchFailure {
            updated: applied,
            failures: result.errors,
        };
        error!("{}", err);
        self.error = Some(err.to_string());
        Err(err)
    }

    /// Settings in one category, ordered by key
    pub fn get_settings_by_category(&self, category_id: &str) -> Vec<&Setting> {
        let mut settings: Vec<_> = self
            .settings
            .values()
            .filter(|s| s.category == category_id)
            .collect();
        settings.sort_by(|a, b| a.key.cmp(&b.key));
        settings
    }

    pub fn validate_setting(&self, key: &str, value: &SettingValue) -> Result<(), ValidationError> {
        let setting = self
            .settings
            .get(key)
            .ok_or_else(|| ValidationError::UnknownKey(key.to_string()))?;
        validate_setting_value(setting, value)
    }

    /// Audit history from the store; failures yield an empty list
    pub async fn get_audit_history(&self, setting_key: Option<&str>) -> Vec<AuditEntry> {
        match self.call_store(self.store.list_audit(setting_key)).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to fetch audit history: {}", e);
                Vec::new()
            }
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.settings
            .iter()
            .any(|(key, setting)| self.differs_from_baseline(key, setting))
    }

    /// Keys whose in-memory value differs from the baseline, sorted
    pub fn dirty_keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self
            .settings
            .iter()
            .filter(|(key, setting)| self.differs_from_baseline(key, setting))
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Baseline-vs-current diff as a change tracker, for describing edits
    pub fn unsaved_changes(&self) -> ChangeTracker {
        let mut tracker = ChangeTracker::new();
        for key in self.dirty_keys() {
            if let (Some(original), Some(current)) =
                (self.original_settings.get(key), self.settings.get(key))
            {
                tracker.track_change(key, original.value.clone(), current.value.clone(), None);
            }
        }
        tracker
    }

    /// Restore the in-memory view from the baseline. Nothing is written back
    /// to the store.
    pub fn reset_changes(&mut self) {
        debug!("Resetting {} unsaved settings", self.dirty_keys().len());
        self.settings = self.original_settings.clone();
        self.emit(SettingsEvent::ChangesReset);
    }

    fn differs_from_baseline(&self, key: &str, setting: &Setting) -> bool {
        self.original_settings
            .get(key)
            .map_or(true, |original| original.value != setting.value)
    }

    fn emit(&self, event: SettingsEvent) {
        // No subscribers is not an error
        let _ = self.event_tx.send(event);
    }

    async fn call_store<T>(
        &self,
        request: impl Future<Output = StorageResult<T>>,
    ) -> SettingsResult<T> {
        match self.config.store_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| SettingsError::Timeout(limit))?
                .map_err(SettingsError::from),
            None => request.await.map_err(SettingsError::from),
        }
    }
}
