// ABOUTME: Settings registry with load-time consistency checks
// ABOUTME: Rejects configuration defects such as select settings without options

use crate::types::{Category, Setting, SettingType};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Select setting {0} must declare validation options")]
    MissingOptions(String),

    #[error("Duplicate setting key: {0}")]
    DuplicateKey(String),
}

/// A checked set of settings and their categories
#[derive(Debug, Clone, Default)]
pub struct SettingsRegistry {
    settings: HashMap<String, Setting>,
    categories: Vec<Category>,
}

impl SettingsRegistry {
    pub fn new(
        settings: impl IntoIterator<Item = Setting>,
        categories: Vec<Category>,
    ) -> Result<Self, RegistryError> {
        let mut map = HashMap::new();

        for setting in settings {
            check_setting(&setting)?;
            if map.contains_key(&setting.key) {
                return Err(RegistryError::DuplicateKey(setting.key));
            }
            map.insert(setting.key.clone(), setting);
        }

        Ok(Self {
            settings: map,
            categories,
        })
    }

    /// Build a registry from an already keyed map, as returned by a store
    pub fn from_map(
        settings: HashMap<String, Setting>,
        categories: Vec<Category>,
    ) -> Result<Self, RegistryError> {
        for setting in settings.values() {
            check_setting(setting)?;
        }

        Ok(Self {
            settings,
            categories,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.settings.get(key)
    }

    pub fn settings(&self) -> &HashMap<String, Setting> {
        &self.settings
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn into_parts(self) -> (HashMap<String, Setting>, Vec<Category>) {
        (self.settings, self.categories)
    }
}

fn check_setting(setting: &Setting) -> Result<(), RegistryError> {
    if setting.setting_type() == SettingType::Select {
        let has_options = setting
            .validation
            .as_ref()
            .and_then(|rule| rule.options.as_ref())
            .is_some_and(|options| !options.is_empty());

        if !has_options {
            return Err(RegistryError::MissingOptions(setting.key.clone()));
        }
    }

    Ok(())
}
