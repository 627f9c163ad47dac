// ABOUTME: Type definitions for system settings
// ABOUTME: Typed setting values, validation rules, categories, pending changes and audit entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of a setting value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    String,
    Number,
    Boolean,
    /// Enumerated string restricted to `ValidationRule::options`
    Select,
}

impl SettingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Number => "number",
            SettingType::Boolean => "boolean",
            SettingType::Select => "select",
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting value tagged with its kind.
///
/// Serializes as `{"type": "number", "value": 5}` so the declared type and
/// the payload can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Select(String),
}

impl SettingValue {
    pub fn setting_type(&self) -> SettingType {
        match self {
            SettingValue::String(_) => SettingType::String,
            SettingValue::Number(_) => SettingType::Number,
            SettingValue::Boolean(_) => SettingType::Boolean,
            SettingValue::Select(_) => SettingType::Select,
        }
    }

    /// Empty means "no value supplied": an empty string or select payload.
    pub fn is_empty(&self) -> bool {
        match self {
            SettingValue::String(s) | SettingValue::Select(s) => s.is_empty(),
            SettingValue::Number(_) | SettingValue::Boolean(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) | SettingValue::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::String(s) | SettingValue::Select(s) => f.write_str(s),
            SettingValue::Number(n) => write!(f, "{}", n),
            SettingValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Validation rules attached to a setting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: bool,
    /// Minimum string length or numeric value (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum string length or numeric value (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regular expression, strings only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Closed option set, select settings only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    #[serde(flatten)]
    pub value: SettingValue,
    pub category: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
    #[serde(default)]
    pub requires_restart: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl Setting {
    pub fn new(
        key: impl Into<String>,
        category: impl Into<String>,
        label: impl Into<String>,
        value: SettingValue,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            category: category.into(),
            label: label.into(),
            description: None,
            validation: None,
            requires_restart: false,
            updated_at: None,
            updated_by: None,
        }
    }

    pub fn with_validation(mut self, rule: ValidationRule) -> Self {
        self.validation = Some(rule);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn setting_type(&self) -> SettingType {
        self.value.setting_type()
    }
}

/// Display grouping for settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// An uncommitted edit staged against the last-known value of a setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub key: String,
    pub old_value: SettingValue,
    pub new_value: SettingValue,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

/// Immutable record of a committed setting change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub setting_key: String,
    pub old_value: Option<SettingValue>,
    pub new_value: SettingValue,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Audit entry before the store assigns an id and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub setting_key: String,
    pub old_value: Option<SettingValue>,
    pub new_value: SettingValue,
    pub changed_by: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingUpdateItem {
    pub key: String,
    pub value: SettingValue,
}

impl SettingUpdateItem {
    pub fn new(key: impl Into<String>, value: SettingValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyError {
    pub key: String,
    pub error: String,
}

/// Per-key outcome of a bulk write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateResult {
    pub updated: Vec<SettingUpdateItem>,
    pub errors: Vec<KeyError>,
}
