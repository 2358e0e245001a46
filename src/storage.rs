//! Named configuration storages and definition reconciliation.

use crate::definition::{Control, Definition};
use crate::error::{ConfigError, ConfigResult};
use crate::types::{
    DIR_PREFIX, Record, URL_PREFIX, decode_serialized, encode_serialized, join_key,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// A named flat key/value map plus the definition it was reconciled against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Storage {
    name: String,
    data: BTreeMap<String, Value>,
    definition: Definition,
    structure: BTreeMap<String, Control>,
}

impl Storage {
    /// Create an empty storage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// All stored values.
    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// Every definition applied so far, merged into one tree.
    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    /// Flattened control metadata, keyed by dotted key.
    pub fn structure(&self) -> &BTreeMap<String, Control> {
        &self.structure
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Look up a stored value.
    ///
    /// Missing keys are an error; defaults are only applied by
    /// [`Storage::set_definition`], never on read.
    pub fn get_value(&self, key: &str) -> ConfigResult<&Value> {
        self.data
            .get(key)
            .ok_or_else(|| ConfigError::key_not_found(&self.name, key))
    }

    /// Store a value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Store every entry under `dir.<name>`.
    pub fn add_paths<K, V>(&mut self, dirs: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.add_prefixed(DIR_PREFIX, dirs);
    }

    /// Store every entry under `url.<name>`.
    pub fn add_urls<K, V>(&mut self, urls: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.add_prefixed(URL_PREFIX, urls);
    }

    fn add_prefixed<K, V>(&mut self, prefix: &str, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in entries {
            self.data
                .insert(join_key(prefix, name.as_ref()), value.into());
        }
    }

    /// Reconcile stored values against a definition tree.
    ///
    /// Every control reachable in `definition` gets a `structure` entry and a
    /// `data` entry. Missing values are filled from the control default (or
    /// null); values that are already present are never replaced. For controls
    /// flagged `serialize`, string values holding a serialized array or object
    /// are decoded in place.
    ///
    /// Calling this again with the same tree changes nothing; calling it with a
    /// grown tree only adds the new keys. Keys no longer defined are kept.
    pub fn set_definition(&mut self, definition: Definition) {
        let before = self.structure.len();
        self.reconcile(&definition, "");
        self.definition.merge(definition);
        debug!(
            storage = %self.name,
            controls = self.structure.len(),
            added = self.structure.len() - before,
            "applied definition"
        );
    }

    fn reconcile(&mut self, definition: &Definition, prefix: &str) {
        for (name, control) in definition.controls() {
            let key = join_key(prefix, name);
            self.structure.insert(key.clone(), control.clone());

            let value = self
                .data
                .entry(key)
                .or_insert_with(|| control.default.clone().unwrap_or(Value::Null));

            if control.serialize {
                if let Some(decoded) = decode_serialized(value) {
                    *value = decoded;
                }
            }
        }

        for (name, group) in definition.groups() {
            self.reconcile(group, &join_key(prefix, name));
        }
    }

    /// Stored keys that no applied definition declares.
    ///
    /// Empty until a definition has been applied, so an undefined storage is
    /// never reported as entirely obsolete.
    pub fn obsolete_keys(&self) -> Vec<String> {
        if self.structure.is_empty() {
            return Vec::new();
        }
        self.data
            .keys()
            .filter(|key| !self.structure.contains_key(*key))
            .cloned()
            .collect()
    }

    /// Export the stored values as records, in key order.
    ///
    /// Compound values of `serialize` controls are encoded back to strings so
    /// a repository round-trip reproduces the loaded form.
    pub fn to_records(&self) -> ConfigResult<Vec<Record>> {
        self.data
            .iter()
            .map(|(key, value)| {
                let serialize = self.structure.get(key).is_some_and(|c| c.serialize);
                let value = if serialize {
                    encode_serialized(value)
                } else {
                    value.clone()
                };
                Record::new(self.name.as_str(), key.as_str(), value)
            })
            .collect()
    }
}
