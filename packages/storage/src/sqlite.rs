// ABOUTME: SQLite settings store
// ABOUTME: Persists settings, categories and the audit log with sqlx

use crate::{
    check_value_type, generate_audit_id, SettingsSnapshot, SettingsStore, StorageError,
    StorageResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use sysconf_config::SYSCONF_DATABASE_URL;
use sysconf_core::{
    AuditEntry, BulkUpdateResult, Category, KeyError, NewAuditEntry, Setting, SettingUpdateItem,
    SettingValue, SettingsRegistry, ValidationRule,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

const DEFAULT_DATABASE_URL: &str = "sqlite://sysconf.db";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS setting_categories (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        icon TEXT,
        sort_order INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS system_settings (
        key TEXT PRIMARY KEY,
        category TEXT NOT NULL,
        label TEXT NOT NULL,
        description TEXT,
        data_type TEXT NOT NULL,
        value TEXT NOT NULL,
        validation TEXT,
        requires_restart INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT,
        updated_by TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings_audit_log (
        id TEXT PRIMARY KEY,
        setting_key TEXT NOT NULL,
        old_value TEXT,
        new_value TEXT NOT NULL,
        changed_by TEXT NOT NULL,
        changed_at TEXT NOT NULL,
        reason TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_settings_audit_key ON settings_audit_log (setting_key)",
];

pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and ensure the schema exists
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self::new(pool);
        store.initialize().await?;
        Ok(store)
    }

    /// Connect using `SYSCONF_DATABASE_URL`, defaulting to `sysconf.db` in the working directory
    pub async fn connect_from_env() -> StorageResult<Self> {
        let url =
            std::env::var(SYSCONF_DATABASE_URL).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        Self::connect(&url).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist yet
    pub async fn initialize(&self) -> StorageResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Settings schema initialized");
        Ok(())
    }

    /// Insert registry defaults. Existing rows are left untouched so
    /// persisted values survive a restart.
    pub async fn seed(&self, registry: &SettingsRegistry) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        for (index, category) in registry.categories().iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO setting_categories (id, name, description, icon, sort_order)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(&category.icon)
            .bind(index as i64)
            .execute(&mut *tx)
            .await?;
        }

        for setting in registry.settings().values() {
            let validation = setting
                .validation
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                "INSERT OR IGNORE INTO system_settings
                 (key, category, label, description, data_type, value, validation, requires_restart)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&setting.key)
            .bind(&setting.category)
            .bind(&setting.label)
            .bind(&setting.description)
            .bind(setting.setting_type().as_str())
            .bind(serde_json::to_string(&setting.value)?)
            .bind(validation)
            .bind(setting.requires_restart)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Seeded {} settings", registry.len());
        Ok(())
    }

    /// Read, check and update one key inside a transaction. The returned
    /// setting is built from the row read before the update, so nothing can
    /// fail between the write and the commit.
    async fn write_one(
        &self,
        key: &str,
        value: &SettingValue,
        changed_by: &str,
    ) -> StorageResult<(SettingValue, Setting)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM system_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        let existing = Self::row_to_setting(row)?;
        check_value_type(&existing, value)?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE system_settings
             SET value = ?, updated_at = ?, updated_by = ?
             WHERE key = ?",
        )
        .bind(serde_json::to_string(value)?)
        .bind(now)
        .bind(changed_by)
        .bind(key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let old_value = existing.value.clone();
        let updated = Setting {
            value: value.clone(),
            updated_at: Some(now),
            updated_by: Some(changed_by.to_string()),
            ..existing
        };

        Ok((old_value, updated))
    }

    /// Helper to convert row to Setting
    fn row_to_setting(row: SqliteRow) -> StorageResult<Setting> {
        let value: String = row.try_get("value")?;
        let validation: Option<String> = row.try_get("validation")?;

        Ok(Setting {
            key: row.try_get("key")?,
            value: serde_json::from_str(&value)?,
            category: row.try_get("category")?,
            label: row.try_get("label")?,
            description: row.try_get("description")?,
            validation: validation
                .map(|v| serde_json::from_str::<ValidationRule>(&v))
                .transpose()?,
            requires_restart: row.try_get::<i64, _>("requires_restart")? != 0,
            updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
            updated_by: row.try_get("updated_by")?,
        })
    }

    fn row_to_category(row: SqliteRow) -> StorageResult<Category> {
        Ok(Category {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            icon: row.try_get("icon")?,
        })
    }

    fn row_to_audit(row: SqliteRow) -> StorageResult<AuditEntry> {
        let old_value: Option<String> = row.try_get("old_value")?;
        let new_value: String = row.try_get("new_value")?;

        Ok(AuditEntry {
            id: row.try_get("id")?,
            setting_key: row.try_get("setting_key")?,
            old_value: old_value.map(|v| serde_json::from_str(&v)).transpose()?,
            new_value: serde_json::from_str(&new_value)?,
            changed_by: row.try_get("changed_by")?,
            changed_at: row.try_get("changed_at")?,
            reason: row.try_get("reason")?,
        })
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn list(&self, category: Option<&str>) -> StorageResult<SettingsSnapshot> {
        let (setting_rows, category_rows) = match category {
            Some(category) => {
                let settings =
                    sqlx::query("SELECT * FROM system_settings WHERE category = ? ORDER BY key")
                        .bind(category)
                        .fetch_all(&self.pool)
                        .await?;
                let categories = sqlx::query("SELECT * FROM setting_categories WHERE id = ?")
                    .bind(category)
                    .fetch_all(&self.pool)
                    .await?;
                (settings, categories)
            }
            None => {
                let settings = sqlx::query("SELECT * FROM system_settings ORDER BY category, key")
                    .fetch_all(&self.pool)
                    .await?;
                let categories =
                    sqlx::query("SELECT * FROM setting_categories ORDER BY sort_order, id")
                        .fetch_all(&self.pool)
                        .await?;
                (settings, categories)
            }
        };

        let settings = setting_rows
            .into_iter()
            .map(|row| Self::row_to_setting(row).map(|s| (s.key.clone(), s)))
            .collect::<StorageResult<HashMap<_, _>>>()?;

        let categories = category_rows
            .into_iter()
            .map(Self::row_to_category)
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(SettingsSnapshot {
            settings,
            categories,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Setting>> {
        let row = sqlx::query("SELECT * FROM system_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_setting).transpose()
    }

    async fn write(
        &self,
        key: &str,
        value: &SettingValue,
        changed_by: &str,
    ) -> StorageResult<Setting> {
        let (_, setting) = self.write_one(key, value, changed_by).await?;
        Ok(setting)
    }

    async fn write_many(
        &self,
        updates: &[SettingUpdateItem],
        changed_by: &str,
        reason: Option<&str>,
    ) -> StorageResult<BulkUpdateResult> {
        let mut result = BulkUpdateResult::default();

        // Each key is written on its own so one failure does not roll back the rest
        for item in updates {
            match self.write_one(&item.key, &item.value, changed_by).await {
                Ok((old_value, _)) => {
                    if let Some(reason) = reason {
                        let entry = NewAuditEntry {
                            setting_key: item.key.clone(),
                            old_value: Some(old_value),
                            new_value: item.value.clone(),
                            changed_by: changed_by.to_string(),
                            reason: Some(reason.to_string()),
                        };
                        if let Err(e) = self.append_audit(entry).await {
                            warn!("Failed to record audit entry for {}: {}", item.key, e);
                        }
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
        let audit = AuditEntry {
            id: generate_audit_id(),
            setting_key: entry.setting_key,
            old_value: entry.old_value,
            new_value: entry.new_value,
            changed_by: entry.changed_by,
            changed_at: Utc::now(),
            reason: entry.reason,
        };

        let old_value = audit
            .old_value
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO settings_audit_log
             (id, setting_key, old_value, new_value, changed_by, changed_at, reason)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&audit.id)
        .bind(&audit.setting_key)
        .bind(old_value)
        .bind(serde_json::to_string(&audit.new_value)?)
        .bind(&audit.changed_by)
        .bind(audit.changed_at)
        .bind(&audit.reason)
        .execute(&self.pool)
        .await?;

        Ok(audit)
    }

    async fn list_audit(&self, setting_key: Option<&str>) -> StorageResult<Vec<AuditEntry>> {
        let rows = match setting_key {
            Some(key) => {
                sqlx::query(
                    "SELECT * FROM settings_audit_log WHERE setting_key = ?
                     ORDER BY changed_at DESC, rowid DESC",
                )
                .bind(key)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM settings_audit_log ORDER BY changed_at DESC, rowid DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(Self::row_to_audit).collect()
    }
}
