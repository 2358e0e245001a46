//! Accessor bound to a single storage of a registry.

use crate::error::{ConfigError, ConfigResult};
use crate::registry::{Config, Lookup};

/// Reads from one storage of a [`Config`] without repeating its name.
#[derive(Debug, Clone, Default)]
pub struct Cfg<'a> {
    config: Option<&'a Config>,
    storage_name: Option<String>,
}

impl<'a> Cfg<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an accessor that is ready to query.
    pub fn bind(config: &'a Config, storage_name: impl Into<String>) -> Self {
        Self {
            config: Some(config),
            storage_name: Some(storage_name.into()),
        }
    }

    pub fn set_config(&mut self, config: &'a Config) {
        self.config = Some(config);
    }

    pub fn set_storage_name(&mut self, storage_name: impl Into<String>) {
        self.storage_name = Some(storage_name.into());
    }

    pub fn storage_name(&self) -> Option<&str> {
        self.storage_name.as_deref()
    }

    /// Query the bound storage. See [`Config::get`].
    pub fn get(&self, key: &str) -> ConfigResult<Lookup<'a>> {
        let config = self
            .config
            .ok_or_else(|| ConfigError::missing_binding("Config"))?;
        let storage = self
            .storage_name
            .as_deref()
            .ok_or_else(|| ConfigError::missing_binding("storage name"))?;
        config.get(storage, key)
    }
}
