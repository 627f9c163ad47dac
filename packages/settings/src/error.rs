// ABOUTME: Error types for the settings manager
// ABOUTME: Separates validation aborts, transport failures and partial batch failures

use std::time::Duration;
use sysconf_core::{KeyError, RegistryError, ValidationError};
use sysconf_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Unknown setting key: {0}")]
    UnknownKey(String),

    /// Rejected before any store interaction
    #[error("Invalid value for {key}: {source}")]
    Validation {
        key: String,
        source: ValidationError,
    },

    #[error("Settings registry is invalid: {0}")]
    Registry(#[from] RegistryError),

    #[error("Settings store error: {0}")]
    Transport(#[from] StorageError),

    #[error("Settings store did not respond within {0:?}")]
    Timeout(Duration),

    /// The store applied some keys of a batch and rejected others
    #[error("Failed to update {} setting(s): {}", .failures.len(), describe_failures(.failures))]
    PartialBatchFailure {
        updated: Vec<String>,
        failures: Vec<KeyError>,
    },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

impl SettingsError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SettingsError::Validation { .. } | SettingsError::UnknownKey(_)
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, SettingsError::Transport(_) | SettingsError::Timeout(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, SettingsError::PartialBatchFailure { .. })
    }
}

fn describe_failures(failures: &[KeyError]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.key, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
