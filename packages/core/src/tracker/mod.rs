// ABOUTME: In-memory ledger of pending (unsaved) setting edits
// ABOUTME: Diff, undo, per-category filtering and expiry of stale entries

pub mod format;
pub mod sweeper;

use crate::types::{PendingChange, Setting, SettingValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysconf_config::{SYSCONF_PENDING_RETENTION_SECS, SYSCONF_SWEEP_INTERVAL_SECS};
use tracing::debug;

pub use format::{describe_change, display_value, readable_key};
pub use sweeper::ExpirySweeper;

/// Pending changes older than this are discarded
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// How often the expiry sweep runs
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Tracker shared between a session and its expiry sweeper
pub type SharedChangeTracker = Arc<Mutex<ChangeTracker>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl TrackerConfig {
    /// Read overrides from the environment, falling back to the defaults
    /// for missing or out-of-range values.
    pub fn from_env() -> Self {
        let retention = std::env::var(SYSCONF_PENDING_RETENTION_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| (60..=86_400).contains(&v))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETENTION);

        let sweep_interval = std::env::var(SYSCONF_SWEEP_INTERVAL_SECS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| (1..=3_600).contains(&v))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL);

        Self {
            retention,
            sweep_interval,
        }
    }
}

/// Pending edits keyed by setting key.
///
/// Only the original value and the latest edit are kept per key; editing a
/// setting back to its original value drops the entry.
#[derive(Debug)]
pub struct ChangeTracker {
    changes: HashMap<String, PendingChange>,
    retention: Duration,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            changes: HashMap::new(),
            retention,
        }
    }

    pub fn shared(self) -> SharedChangeTracker {
        Arc::new(Mutex::new(self))
    }

    pub fn track_change(
        &mut self,
        key: &str,
        old_value: SettingValue,
        new_value: SettingValue,
        description: Option<String>,
    ) {
        self.track_change_at(key, old_value, new_value, description, Utc::now());
    }

    pub fn track_change_at(
        &mut self,
        key: &str,
        old_value: SettingValue,
        new_value: SettingValue,
        description: Option<String>,
        now: DateTime<Utc>,
    ) {
        if old_value == new_value {
            if self.changes.remove(key).is_some() {
                debug!("Edit restored original value, dropped pending change: {}", key);
            }
            return;
        }

        self.changes.insert(
            key.to_string(),
            PendingChange {
                key: key.to_string(),
                old_value,
                new_value,
                timestamp: now,
                description,
            },
        );
    }

    /// Returns true if a pending change was removed
    pub fn clear_change(&mut self, key: &str) -> bool {
        self.changes.remove(key).is_some()
    }

    pub fn clear_all_changes(&mut self) {
        self.changes.clear();
    }

    /// Remove the pending change and hand back the value to restore
    pub fn undo_change(&mut self, key: &str) -> Option<SettingValue> {
        self.changes.remove(key).map(|change| change.old_value)
    }

    pub fn get_change(&self, key: &str) -> Option<&PendingChange> {
        self.changes.get(key)
    }

    /// All pending changes, most recent first
    pub fn changes(&self) -> Vec<&PendingChange> {
        let mut changes: Vec<_> = self.changes.values().collect();
        changes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.key.cmp(&b.key)));
        changes
    }

    pub fn changes_by_category(
        &self,
        category_id: &str,
        settings: &HashMap<String, Setting>,
    ) -> Vec<&PendingChange> {
        self.changes()
            .into_iter()
            .filter(|change| {
                settings
                    .get(&change.key)
                    .is_some_and(|s| s.category == category_id)
            })
            .collect()
    }

    pub fn change_description(&self, key: &str) -> Option<String> {
        self.changes
            .get(key)
            .map(|c| describe_change(&c.key, &c.old_value, &c.new_value))
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Drop entries older than the retention window, returning how many went
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let Ok(retention) = chrono::Duration::from_std(self.retention) else {
            return 0;
        };
        let cutoff = now - retention;

        let before = self.changes.len();
        self.changes.retain(|_, change| change.timestamp >= cutoff);
        before - self.changes.len()
    }
}
