//! The storage registry.
//!
//! [`Config`] owns every named [`Storage`] and the [`Repository`] they are
//! loaded from. Loading and definition application are separate steps:
//!
//! ```no_run
//! use cfgstore::definition::{Control, Definition};
//! use cfgstore::repository::FileRepository;
//! use cfgstore::Config;
//!
//! let mut config = Config::new(Box::new(FileRepository::new("config.json")));
//! config.load()?;
//! config.apply_definition(
//!     "app",
//!     Definition::new().with_control("timeout", Control::new().with_default(30)),
//! );
//! let timeout = config.get("app", "timeout")?;
//! # Ok::<(), cfgstore::error::Error>(())
//! ```

use crate::definition::Definition;
use crate::error::{ConfigError, ConfigResult, RepositoryResult, Result};
use crate::repository::Repository;
use crate::storage::Storage;
use crate::types::{Record, is_truthy};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Result of [`Config::get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// A whole storage was requested.
    All(&'a BTreeMap<String, Value>),
    /// A single key was requested.
    Value(&'a Value),
}

impl Lookup<'_> {
    /// Convert to an owned JSON value; whole storages become objects.
    pub fn to_value(&self) -> Value {
        match self {
            Lookup::All(data) => Value::Object(
                data.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            Lookup::Value(value) => (*value).clone(),
        }
    }

    /// The single value, if one key was requested.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Lookup::Value(value) => Some(*value),
            Lookup::All(_) => None,
        }
    }
}

/// Registry of named storages backed by a repository.
pub struct Config {
    storages: BTreeMap<String, Storage>,
    repository: Box<dyn Repository>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("storages", &self.storages.keys().collect::<Vec<_>>())
            .field("repository", &self.repository.describe())
            .finish()
    }
}

impl Config {
    pub fn new(repository: Box<dyn Repository>) -> Self {
        Self {
            storages: BTreeMap::new(),
            repository,
        }
    }

    /// Swap the repository used by [`Config::load`], [`Config::save`] and [`Config::prune`].
    pub fn set_repository(&mut self, repository: Box<dyn Repository>) {
        self.repository = repository;
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repository.as_ref()
    }

    /// Return the named storage, creating an empty one on first use.
    pub fn create_storage(&mut self, name: &str) -> &mut Storage {
        self.storages
            .entry(name.to_string())
            .or_insert_with(|| Storage::new(name))
    }

    /// Look up an existing storage. Never creates one.
    pub fn get_storage(&self, name: &str) -> ConfigResult<&Storage> {
        self.storages
            .get(name)
            .ok_or_else(|| ConfigError::storage_not_found(name))
    }

    pub fn get_storage_mut(&mut self, name: &str) -> ConfigResult<&mut Storage> {
        self.storages
            .get_mut(name)
            .ok_or_else(|| ConfigError::storage_not_found(name))
    }

    /// Names of all storages, sorted.
    pub fn storage_names(&self) -> impl Iterator<Item = &str> {
        self.storages.keys().map(String::as_str)
    }

    pub fn storages(&self) -> impl Iterator<Item = &Storage> {
        self.storages.values()
    }

    /// Read a value, or a whole storage when `key` is empty.
    ///
    /// An empty key against an unknown or empty storage is an error, as is a
    /// key the storage does not hold.
    pub fn get(&self, storage: &str, key: &str) -> ConfigResult<Lookup<'_>> {
        let found = self.storages.get(storage);

        if key.is_empty() {
            return match found {
                Some(s) if !s.is_empty() => Ok(Lookup::All(s.data())),
                Some(_) => Err(ConfigError::key_not_found(storage, key)),
                None => Err(ConfigError::storage_not_found(storage)),
            };
        }

        match found {
            Some(s) => s.get_value(key).map(Lookup::Value),
            None => Err(ConfigError::key_not_found(storage, key)),
        }
    }

    /// Set a value in an existing storage.
    pub fn set(&mut self, storage: &str, key: impl Into<String>, value: impl Into<Value>) -> ConfigResult<()> {
        self.get_storage_mut(storage)?.set(key, value);
        Ok(())
    }

    /// Whether a storage, or a key within it, is set.
    ///
    /// Without a key, any known storage counts. With a key, the value must be
    /// present and truthy: null, `false`, zero, `""`, `"0"` and empty
    /// collections count as not set.
    pub fn exists(&self, storage: &str, key: Option<&str>) -> bool {
        let Some(found) = self.storages.get(storage) else {
            return false;
        };
        match key {
            None => true,
            Some(key) => found.data().get(key).is_some_and(is_truthy),
        }
    }

    /// Reconcile a storage against a definition, creating the storage if needed.
    pub fn apply_definition(&mut self, storage: &str, definition: Definition) -> &mut Storage {
        let target = self.create_storage(storage);
        target.set_definition(definition);
        target
    }

    /// Read every record from the repository and route it into its storage.
    ///
    /// Returns the number of records loaded. A failed read aborts the load
    /// before any storage is touched. Duplicate keys within one read resolve
    /// to the last record.
    pub fn load(&mut self) -> RepositoryResult<usize> {
        let records = self.repository.read()?;
        let count = records.len();

        for record in records {
            let (storage, key, value) = record.into_parts();
            let target = self.create_storage(&storage);
            if target.has(&key) {
                debug!(storage = %storage, key = %key, "duplicate record, keeping the last value");
            }
            target.set(key, value);
        }

        info!(
            records = count,
            storages = self.storages.len(),
            source = %self.repository.describe(),
            "loaded configuration"
        );
        Ok(count)
    }

    /// Every stored value as records, ordered by storage then key.
    pub fn to_records(&self) -> ConfigResult<Vec<Record>> {
        let mut records = Vec::new();
        for storage in self.storages.values() {
            records.extend(storage.to_records()?);
        }
        Ok(records)
    }

    /// Persist every storage through the repository.
    pub fn save(&self) -> Result<()> {
        let records = self.to_records()?;
        self.repository.write(&records)?;
        info!(
            records = records.len(),
            target = %self.repository.describe(),
            "saved configuration"
        );
        Ok(())
    }

    /// Remove keys no applied definition declares, from the storage and the repository.
    ///
    /// Returns the removed keys. A storage without any applied definition is
    /// left alone.
    pub fn prune(&mut self, storage: &str) -> Result<Vec<String>> {
        let target = self
            .storages
            .get_mut(storage)
            .ok_or_else(|| ConfigError::storage_not_found(storage))?;

        let obsolete = target.obsolete_keys();
        if obsolete.is_empty() {
            return Ok(obsolete);
        }

        self.repository.prune(storage, &obsolete)?;
        for key in &obsolete {
            target.remove(key);
        }
        info!(storage, removed = obsolete.len(), "pruned obsolete keys");
        Ok(obsolete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Control;
    use crate::error::{ErrorCode, RepositoryError};
    use serde_json::json;

    /// Repository returning a fixed set of records.
    struct Fixed(Vec<Record>);

    impl Repository for Fixed {
        fn read(&self) -> RepositoryResult<Vec<Record>> {
            Ok(self.0.clone())
        }

        fn write(&self, _records: &[Record]) -> RepositoryResult<()> {
            Ok(())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    struct Failing;

    impl Repository for Failing {
        fn read(&self) -> RepositoryResult<Vec<Record>> {
            Err(RepositoryError::MissingPath)
        }

        fn write(&self, _records: &[Record]) -> RepositoryResult<()> {
            Err(RepositoryError::MissingPath)
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn empty() -> Config {
        Config::new(Box::new(Fixed(Vec::new())))
    }

    #[test]
    fn test_create_storage_is_idempotent() {
        let mut config = empty();
        config.create_storage("app").set("k", "v");
        let again = config.create_storage("app");
        assert_eq!(again.get_value("k").unwrap(), &json!("v"));
        assert_eq!(config.storage_names().count(), 1);
    }

    #[test]
    fn test_get_storage_never_creates() {
        let config = empty();
        let err = config.get_storage("missing").unwrap_err();
        assert_eq!(err.code, ErrorCode::StorageNotFound);
        assert_eq!(config.storage_names().count(), 0);
    }

    #[test]
    fn test_get_empty_key_on_empty_storage_fails() {
        let mut config = empty();
        config.create_storage("app");
        assert!(config.get("app", "").is_err());
        assert_eq!(
            config.get("nope", "").unwrap_err().code,
            ErrorCode::StorageNotFound
        );
        assert_eq!(
            config.get("nope", "k").unwrap_err().code,
            ErrorCode::KeyNotFound
        );
    }

    #[test]
    fn test_set_requires_existing_storage() {
        let mut config = empty();
        assert!(config.set("app", "k", 1).is_err());
        config.create_storage("app");
        config.set("app", "k", 1).unwrap();
        assert_eq!(config.get("app", "k").unwrap(), Lookup::Value(&json!(1)));
    }

    #[test]
    fn test_exists() {
        let mut config = empty();
        assert!(!config.exists("app", None));

        config.create_storage("app").set("blank", "");
        assert!(config.exists("app", None));
        assert!(!config.exists("app", Some("blank")));
        assert!(!config.exists("app", Some("missing")));

        config.set("app", "blank", "filled").unwrap();
        assert!(config.exists("app", Some("blank")));
    }

    #[test]
    fn test_load_last_duplicate_wins() {
        let records = vec![
            Record::new("app", "k", "first").unwrap(),
            Record::new("app", "k", "second").unwrap(),
        ];
        let mut config = Config::new(Box::new(Fixed(records)));
        assert_eq!(config.load().unwrap(), 2);
        assert_eq!(config.get("app", "k").unwrap().to_value(), json!("second"));
    }

    #[test]
    fn test_failed_load_leaves_registry_untouched() {
        let mut config = Config::new(Box::new(Failing));
        assert!(config.load().is_err());
        assert_eq!(config.storage_names().count(), 0);
    }

    #[test]
    fn test_apply_definition_creates_storage() {
        let mut config = empty();
        config.apply_definition(
            "app",
            Definition::new().with_control("debug", Control::new().with_default(false)),
        );
        assert_eq!(config.get("app", "debug").unwrap().to_value(), json!(false));
        assert!(!config.exists("app", Some("debug")));
    }

    #[test]
    fn test_prune_without_definition_removes_nothing() {
        let mut config = empty();
        config.create_storage("app").set("old", "1");
        assert!(config.prune("app").unwrap().is_empty());
        assert!(config.exists("app", Some("old")));
    }

    #[test]
    fn test_prune_with_default_repository_prune() {
        let mut config = Config::new(Box::new(Failing));
        let storage = config.create_storage("app");
        storage.set("old", "1");
        storage.set_definition(Definition::new().with_control("new", Control::new()));

        // Failing keeps the trait's default prune, which reports nothing removed.
        assert_eq!(config.prune("app").unwrap(), vec!["old".to_string()]);
        assert!(!config.get_storage("app").unwrap().has("old"));
    }

    #[test]
    fn test_save_propagates_write_errors() {
        let mut config = Config::new(Box::new(Failing));
        config.create_storage("app").set("k", "v");
        assert!(matches!(
            config.save(),
            Err(crate::error::Error::Repository(RepositoryError::MissingPath))
        ));
    }
}
