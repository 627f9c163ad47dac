// ABOUTME: Settings manager configuration
// ABOUTME: Store timeout, caller identity and event channel size from the environment

use std::env;
use std::num::ParseIntError;
use std::time::Duration;
use sysconf_config::{SYSCONF_CHANGED_BY, SYSCONF_EVENT_CHANNEL_SIZE, SYSCONF_STORE_TIMEOUT_SECS};
use thiserror::Error;

/// Default capacity for the settings event channel
pub const DEFAULT_EVENT_CHANNEL_SIZE: usize = 64;

pub const DEFAULT_CHANGED_BY: &str = "system";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid number in {0}: {1}")]
    InvalidNumber(&'static str, ParseIntError),
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Upper bound on each store round trip; `None` waits indefinitely
    pub store_timeout: Option<Duration>,
    /// Identity recorded on writes and audit entries
    pub changed_by: String,
    pub event_channel_size: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            store_timeout: None,
            changed_by: DEFAULT_CHANGED_BY.to_string(),
            event_channel_size: DEFAULT_EVENT_CHANNEL_SIZE,
        }
    }
}

impl ManagerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_timeout = match read_u64(SYSCONF_STORE_TIMEOUT_SECS)? {
            None | Some(0) => None,
            Some(secs) => Some(Duration::from_secs(check_range(
                SYSCONF_STORE_TIMEOUT_SECS,
                secs,
                1,
                300,
            )?)),
        };

        let changed_by = env::var(SYSCONF_CHANGED_BY)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CHANGED_BY.to_string());

        let event_channel_size = match read_u64(SYSCONF_EVENT_CHANNEL_SIZE)? {
            Some(size) => check_range(SYSCONF_EVENT_CHANNEL_SIZE, size, 10, 10_000)? as usize,
            None => DEFAULT_EVENT_CHANNEL_SIZE,
        };

        Ok(Self {
            store_timeout,
            changed_by,
            event_channel_size,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    pub fn with_changed_by(mut self, changed_by: impl Into<String>) -> Self {
        self.changed_by = changed_by.into();
        self
    }
}

fn read_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidNumber(name, e)),
        Err(_) => Ok(None),
    }
}

fn check_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<u64, ConfigError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}
