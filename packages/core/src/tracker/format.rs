// ABOUTME: Human-readable rendering of setting keys and values
// ABOUTME: Used to describe pending changes as "Name: old → new"

use crate::types::SettingValue;

const MAX_DISPLAY_CHARS: usize = 50;
const TRUNCATED_CHARS: usize = 47;

/// `system.maintenance_mode` -> `Maintenance Mode`
pub fn readable_key(key: &str) -> String {
    let last = key.rsplit('.').next().unwrap_or(key);

    last.split('_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn display_value(value: &SettingValue) -> String {
    match value {
        SettingValue::Boolean(true) => "Enabled".to_string(),
        SettingValue::Boolean(false) => "Disabled".to_string(),
        v if v.is_empty() => "(empty)".to_string(),
        SettingValue::String(s) | SettingValue::Select(s) => {
            if s.chars().count() > MAX_DISPLAY_CHARS {
                let head: String = s.chars().take(TRUNCATED_CHARS).collect();
                format!("{}...", head)
            } else {
                s.clone()
            }
        }
        SettingValue::Number(n) => n.to_string(),
    }
}

pub fn describe_change(key: &str, old: &SettingValue, new: &SettingValue) -> String {
    format!(
        "{}: {} → {}",
        readable_key(key),
        display_value(old),
        display_value(new)
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
