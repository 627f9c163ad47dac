// ABOUTME: Settings change notifications
// ABOUTME: Events broadcast to in-process observers such as a UI layer

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettingsEvent {
    /// Settings were (re)fetched and adopted as the new baseline
    Loaded { count: usize },
    SettingUpdated { key: String },
    /// Keys the store reported as written, including after a partial failure
    BatchUpdated { keys: Vec<String> },
    ChangesReset,
}
