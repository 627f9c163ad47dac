// ABOUTME: Input validation for system settings
// ABOUTME: Type, required, range, pattern and option checks against a setting's declared rules

use crate::types::{Setting, SettingType, SettingValue};
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Wrong type: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: SettingType,
        actual: SettingType,
    },

    #[error("Value is required")]
    RequiredMissing,

    #[error("Must be at least {min} characters")]
    TooShort { min: f64 },

    #[error("Must be at most {max} characters")]
    TooLong { max: f64 },

    #[error("Value must be at least {min}")]
    BelowMinimum { min: f64 },

    #[error("Value must be at most {max}")]
    AboveMaximum { max: f64 },

    #[error("Value must be a finite number")]
    NotFinite,

    #[error("Value does not match pattern: {pattern}")]
    PatternMismatch { pattern: String },

    #[error("Invalid validation pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid option: {value}. Must be one of: {}", .options.join(", "))]
    InvalidOption { value: String, options: Vec<String> },

    #[error("Unknown setting key: {0}")]
    UnknownKey(String),
}

/// Coarse error classes, as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    TypeMismatch,
    RequiredMissing,
    OutOfRange,
    PatternMismatch,
    InvalidOption,
    UnknownKey,
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::TypeMismatch { .. } => ValidationErrorKind::TypeMismatch,
            ValidationError::RequiredMissing => ValidationErrorKind::RequiredMissing,
            ValidationError::TooShort { .. }
            | ValidationError::TooLong { .. }
            | ValidationError::BelowMinimum { .. }
            | ValidationError::AboveMaximum { .. }
            | ValidationError::NotFinite => ValidationErrorKind::OutOfRange,
            ValidationError::PatternMismatch { .. } | ValidationError::InvalidPattern { .. } => {
                ValidationErrorKind::PatternMismatch
            }
            ValidationError::InvalidOption { .. } => ValidationErrorKind::InvalidOption,
            ValidationError::UnknownKey(_) => ValidationErrorKind::UnknownKey,
        }
    }
}

/// Validate a candidate value against a setting's declared type and rules
pub fn validate_setting_value(
    setting: &Setting,
    value: &SettingValue,
) -> Result<(), ValidationError> {
    // Type check comes first and ignores the rule set entirely
    let expected = setting.setting_type();
    let actual = value.setting_type();
    if expected != actual {
        return Err(ValidationError::TypeMismatch { expected, actual });
    }

    // NaN slips past every bound comparison and cannot be stored as JSON
    if let SettingValue::Number(n) = value {
        if !n.is_finite() {
            return Err(ValidationError::NotFinite);
        }
    }

    let Some(rule) = &setting.validation else {
        return Ok(());
    };

    if value.is_empty() {
        return if rule.required {
            Err(ValidationError::RequiredMissing)
        } else {
            Ok(())
        };
    }

    match value {
        SettingValue::String(s) => {
            validate_length(s, rule.min, rule.max)?;
            if let Some(pattern) = &rule.pattern {
                validate_pattern(s, pattern)?;
            }
        }
        SettingValue::Number(n) => validate_number(*n, rule.min, rule.max)?,
        SettingValue::Select(s) => {
            validate_option(s, rule.options.as_deref().unwrap_or_default())?
        }
        SettingValue::Boolean(_) => {}
    }

    Ok(())
}

/// Validate several values at once, collecting every failure by setting key
pub fn validate_multiple(
    entries: &[(&Setting, &SettingValue)],
) -> BTreeMap<String, ValidationError> {
    entries
        .iter()
        .filter_map(|(setting, value)| {
            validate_setting_value(setting, value)
                .err()
                .map(|err| (setting.key.clone(), err))
        })
        .collect()
}

/// Validate string length (in characters) with optional bounds
fn validate_length(value: &str, min: Option<f64>, max: Option<f64>) -> Result<(), ValidationError> {
    let len = value.chars().count() as f64;

    if let Some(min) = min {
        if len < min {
            return Err(ValidationError::TooShort { min });
        }
    }

    if let Some(max) = max {
        if len > max {
            return Err(ValidationError::TooLong { max });
        }
    }

    Ok(())
}

/// Validate numeric value with optional min/max bounds
fn validate_number(value: f64, min: Option<f64>, max: Option<f64>) -> Result<(), ValidationError> {
    if let Some(min) = min {
        if value < min {
            return Err(ValidationError::BelowMinimum { min });
        }
    }

    if let Some(max) = max {
        if value > max {
            return Err(ValidationError::AboveMaximum { max });
        }
    }

    Ok(())
}

fn validate_pattern(value: &str, pattern: &str) -> Result<(), ValidationError> {
    let regex = Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    if regex.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::PatternMismatch {
            pattern: pattern.to_string(),
        })
    }
}

/// Validate enum value
fn validate_option(value: &str, options: &[String]) -> Result<(), ValidationError> {
    if options.iter().any(|o| o == value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOption {
            value: value.to_string(),
            options: options.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationRule;
    use rstest::rstest;

    fn number_setting(min: Option<f64>, max: Option<f64>) -> Setting {
        Setting::new(
            "performance.max_streams",
            "performance",
            "Max Streams",
            SettingValue::Number(10.0),
        )
        .with_validation(ValidationRule {
            required: true,
            min,
            max,
            ..Default::default()
        })
    }

    fn string_setting(rule: ValidationRule) -> Setting {
        Setting::new(
            "system.name",
            "system",
            "System Name",
            SettingValue::String("sysconf".into()),
        )
        .with_validation(rule)
    }

    fn select_setting() -> Setting {
        Setting::new(
            "system.log_level",
            "system",
            "Log Level",
            SettingValue::Select("info".into()),
        )
        .with_validation(ValidationRule {
            options: Some(vec!["debug".into(), "info".into(), "warn".into()]),
            ..Default::default()
        })
    }

    #[rstest]
    #[case(1.0, true)]
    #[case(1000.0, true)]
    #[case(500.0, true)]
    #[case(0.0, false)]
    #[case(1001.0, false)]
    fn test_number_bounds(#[case] value: f64, #[case] valid: bool) {
        let setting = number_setting(Some(1.0), Some(1000.0));
        let result = validate_setting_value(&setting, &SettingValue::Number(value));
        assert_eq!(result.is_ok(), valid, "value {}", value);
    }

    #[rstest]
    #[case(f64::NAN, Some(1.0), Some(1000.0))]
    #[case(f64::INFINITY, Some(1.0), Some(1000.0))]
    #[case(f64::NEG_INFINITY, Some(1.0), Some(1000.0))]
    #[case(f64::NAN, None, None)]
    #[case(f64::INFINITY, Some(1.0), None)]
    #[case(f64::NEG_INFINITY, None, Some(1000.0))]
    fn test_non_finite_numbers_rejected(
        #[case] value: f64,
        #[case] min: Option<f64>,
        #[case] max: Option<f64>,
    ) {
        let setting = number_setting(min, max);
        let err = validate_setting_value(&setting, &SettingValue::Number(value)).unwrap_err();
        assert_eq!(err, ValidationError::NotFinite);
        assert_eq!(err.kind(), ValidationErrorKind::OutOfRange);
    }

    #[test]
    fn test_non_finite_rejected_without_rule() {
        let setting = Setting::new(
            "performance.ratio",
            "performance",
            "Ratio",
            SettingValue::Number(0.5),
        );
        assert_eq!(
            validate_setting_value(&setting, &SettingValue::Number(f64::NAN)),
            Err(ValidationError::NotFinite)
        );
    }

    #[test]
    fn test_number_bound_messages() {
        let setting = number_setting(Some(1.0), Some(1000.0));

        let below = validate_setting_value(&setting, &SettingValue::Number(0.0)).unwrap_err();
        assert!(below.to_string().contains("at least 1"));

        let above = validate_setting_value(&setting, &SettingValue::Number(1001.0)).unwrap_err();
        assert!(above.to_string().contains("at most 1000"));
        assert_eq!(above.kind(), ValidationErrorKind::OutOfRange);
    }

    #[test]
    fn test_number_single_bound() {
        let only_min = number_setting(Some(5.0), None);
        assert!(validate_setting_value(&only_min, &SettingValue::Number(1e9)).is_ok());
        assert!(validate_setting_value(&only_min, &SettingValue::Number(4.0)).is_err());

        let only_max = number_setting(None, Some(5.0));
        assert!(validate_setting_value(&only_max, &SettingValue::Number(-1e9)).is_ok());
        assert!(validate_setting_value(&only_max, &SettingValue::Number(6.0)).is_err());
    }

    #[rstest]
    #[case(2, false)]
    #[case(3, true)]
    #[case(8, true)]
    #[case(9, false)]
    fn test_string_length_bounds(#[case] len: usize, #[case] valid: bool) {
        let setting = string_setting(ValidationRule {
            min: Some(3.0),
            max: Some(8.0),
            ..Default::default()
        });
        let value = SettingValue::String("x".repeat(len));
        assert_eq!(validate_setting_value(&setting, &value).is_ok(), valid);
    }

    #[test]
    fn test_string_length_counts_characters() {
        let setting = string_setting(ValidationRule {
            max: Some(3.0),
            ..Default::default()
        });
        // Three characters, nine bytes
        let value = SettingValue::String("日本語".into());
        assert!(validate_setting_value(&setting, &value).is_ok());
    }

    #[test]
    fn test_type_mismatch_ignores_rules() {
        let setting = Setting::new(
            "system.debug",
            "system",
            "Debug",
            SettingValue::Boolean(false),
        );
        let err = validate_setting_value(&setting, &SettingValue::String("yes".into()))
            .unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::TypeMismatch);
        assert!(err.to_string().contains("expected boolean"));
    }

    #[test]
    fn test_no_rule_accepts_any_typed_value() {
        let setting = Setting::new(
            "system.motd",
            "system",
            "Message",
            SettingValue::String("hi".into()),
        );
        assert!(validate_setting_value(&setting, &SettingValue::String(String::new())).is_ok());
    }

    #[test]
    fn test_required_and_optional_empty() {
        let required = string_setting(ValidationRule {
            required: true,
            min: Some(1.0),
            ..Default::default()
        });
        assert_eq!(
            validate_setting_value(&required, &SettingValue::String(String::new())),
            Err(ValidationError::RequiredMissing)
        );

        // Optional fields accept absence even with a min length
        let optional = string_setting(ValidationRule {
            min: Some(5.0),
            pattern: Some("^[a-z]+$".into()),
            ..Default::default()
        });
        assert!(validate_setting_value(&optional, &SettingValue::String(String::new())).is_ok());
    }

    #[test]
    fn test_pattern() {
        let setting = string_setting(ValidationRule {
            pattern: Some(r"^[a-z0-9-]+$".into()),
            ..Default::default()
        });
        assert!(validate_setting_value(&setting, &SettingValue::String("node-1".into())).is_ok());

        let err = validate_setting_value(&setting, &SettingValue::String("Node 1".into()))
            .unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::PatternMismatch);
    }

    #[test]
    fn test_invalid_pattern_is_a_failure_not_a_panic() {
        let setting = string_setting(ValidationRule {
            pattern: Some("([unclosed".into()),
            ..Default::default()
        });
        let err = validate_setting_value(&setting, &SettingValue::String("abc".into()))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { .. }));
        assert!(err.to_string().contains("Invalid validation pattern"));
    }

    #[test]
    fn test_select_options() {
        let setting = select_setting();
        assert!(validate_setting_value(&setting, &SettingValue::Select("warn".into())).is_ok());

        let err = validate_setting_value(&setting, &SettingValue::Select("trace".into()))
            .unwrap_err();
        assert_eq!(err.kind(), ValidationErrorKind::InvalidOption);
        assert_eq!(
            err.to_string(),
            "Invalid option: trace. Must be one of: debug, info, warn"
        );
    }

    #[test]
    fn test_validate_multiple_reports_only_failures() {
        let name = string_setting(ValidationRule {
            required: true,
            ..Default::default()
        });
        let streams = number_setting(Some(1.0), Some(1000.0));
        let level = select_setting();

        let ok_name = SettingValue::String("primary".into());
        let bad_streams = SettingValue::Number(5000.0);
        let ok_level = SettingValue::Select("debug".into());

        let errors = validate_multiple(&[
            (&name, &ok_name),
            (&streams, &bad_streams),
            (&level, &ok_level),
        ]);

        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("performance.max_streams"));
    }

    #[test]
    fn test_validate_multiple_checks_every_entry() {
        let name = string_setting(ValidationRule {
            required: true,
            ..Default::default()
        });
        let streams = number_setting(Some(1.0), Some(1000.0));

        let empty = SettingValue::String(String::new());
        let zero = SettingValue::Number(0.0);

        let errors = validate_multiple(&[(&name, &empty), (&streams, &zero)]);
        assert_eq!(errors.len(), 2);
    }
}
