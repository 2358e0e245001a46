//! Declarative definition trees.
//!
//! A definition describes the keys a storage is expected to hold. It is a tree
//! of named groups whose leaves are controls:
//!
//! ```yaml
//! controls:
//!   timeout: { default: 30 }
//! groups:
//!   db:
//!     controls:
//!       host: { default: localhost }
//!       replicas: { default: "[]", serialize: true }
//! ```
//!
//! Flattening joins group and control names with `.`, so the tree above
//! yields `timeout`, `db.host` and `db.replicas`. Declaration order is kept
//! throughout: controls before sibling groups, parents before children.

use crate::error::{ConfigError, ConfigResult};
use crate::format::DocumentFormat;
use crate::types::join_key;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::Path;

/// A leaf of a definition tree, describing one configuration key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Control {
    /// Value injected when the key is missing at reconciliation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Whether stored string values hold a serialized compound value.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub serialize: bool,

    /// Any other fields, passed through untouched for callers.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Control {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn serialized(mut self) -> Self {
        self.serialize = true;
        self
    }

    pub fn with_extra(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(field.into(), value.into());
        self
    }
}

/// A (sub)tree of controls and nested groups, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawDefinition")]
pub struct Definition {
    controls: Vec<(String, Control)>,
    groups: Vec<(String, Definition)>,
}

/// Wire shape of a definition; maps keep insertion order.
#[derive(Deserialize)]
struct RawDefinition {
    #[serde(default)]
    controls: Option<Map<String, Value>>,
    #[serde(default)]
    groups: Option<Map<String, Value>>,
}

impl TryFrom<RawDefinition> for Definition {
    type Error = ConfigError;

    fn try_from(raw: RawDefinition) -> Result<Self, Self::Error> {
        let mut definition = Definition::new();
        for (name, value) in raw.controls.unwrap_or_default() {
            let control = serde_json::from_value::<Control>(value)
                .map_err(|e| ConfigError::invalid_definition(format!("control {}", name), e))?;
            definition.insert_control(name, control);
        }
        for (name, value) in raw.groups.unwrap_or_default() {
            let group = serde_json::from_value::<Definition>(value)
                .map_err(|e| ConfigError::invalid_definition(format!("group {}", name), e))?;
            definition.insert_group(name, group);
        }
        Ok(definition)
    }
}

struct Entries<'a, T>(&'a [(String, T)]);

impl<T: Serialize> Serialize for Entries<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, entry) in self.0 {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}

impl Serialize for Definition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = usize::from(!self.controls.is_empty()) + usize::from(!self.groups.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        if !self.controls.is_empty() {
            map.serialize_entry("controls", &Entries(&self.controls))?;
        }
        if !self.groups.is_empty() {
            map.serialize_entry("groups", &Entries(&self.groups))?;
        }
        map.end()
    }
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a control, keeping its original position on replace.
    pub fn with_control(mut self, name: impl Into<String>, control: Control) -> Self {
        self.insert_control(name.into(), control);
        self
    }

    /// Add or replace a group, keeping its original position on replace.
    pub fn with_group(mut self, name: impl Into<String>, group: Definition) -> Self {
        self.insert_group(name.into(), group);
        self
    }

    pub fn insert_control(&mut self, name: String, control: Control) {
        match self.controls.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = control,
            None => self.controls.push((name, control)),
        }
    }

    pub fn insert_group(&mut self, name: String, group: Definition) {
        match self.groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = group,
            None => self.groups.push((name, group)),
        }
    }

    /// Controls at this level, in declaration order.
    pub fn controls(&self) -> impl Iterator<Item = (&str, &Control)> {
        self.controls.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Groups at this level, in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.groups.iter().map(|(n, g)| (n.as_str(), g))
    }

    pub fn get_control(&self, name: &str) -> Option<&Control> {
        self.controls.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn get_group(&self, name: &str) -> Option<&Definition> {
        self.groups.iter().find(|(n, _)| n == name).map(|(_, g)| g)
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty() && self.groups.is_empty()
    }

    /// Merge `other` into this tree.
    ///
    /// Controls are replaced whole (last writer wins), groups are merged
    /// recursively, and new entries are appended after existing ones.
    pub fn merge(&mut self, other: Definition) {
        for (name, control) in other.controls {
            self.insert_control(name, control);
        }
        for (name, group) in other.groups {
            match self.groups.iter_mut().find(|(n, _)| *n == name) {
                Some((_, existing)) => existing.merge(group),
                None => self.groups.push((name, group)),
            }
        }
    }

    /// Flatten into `(dotted key, control)` pairs in traversal order.
    pub fn flatten(&self) -> Vec<(String, &Control)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Control)>) {
        for (name, control) in &self.controls {
            out.push((join_key(prefix, name), control));
        }
        for (name, group) in &self.groups {
            group.flatten_into(&join_key(prefix, name), out);
        }
    }
}

/// Parse a definition document. Blank input yields an empty definition.
pub fn parse(content: &str, format: DocumentFormat) -> ConfigResult<Definition> {
    if content.trim().is_empty() {
        return Ok(Definition::new());
    }
    match format {
        DocumentFormat::Json => serde_json::from_str(content)
            .map_err(|e| ConfigError::invalid_definition("document", e)),
        DocumentFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| ConfigError::invalid_definition("document", e)),
    }
}

/// Load a definition from a JSON or YAML file.
pub fn load_file(path: &Path) -> ConfigResult<Definition> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::invalid_definition(path.display(), e))?;
    parse(&content, DocumentFormat::from_path(path))
        .map_err(|e| ConfigError::invalid_definition(path.display(), e))
}

/// Load every `*.json`, `*.yaml` and `*.yml` file in `dir`.
///
/// Each file defines the storage named by its file stem. Results are sorted by
/// storage name. A missing directory yields no definitions.
pub fn load_dir(dir: &Path) -> ConfigResult<Vec<(String, Definition)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries =
        std::fs::read_dir(dir).map_err(|e| ConfigError::invalid_definition(dir.display(), e))?;

    let mut definitions = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ConfigError::invalid_definition(dir.display(), e))?
            .path();
        let is_definition = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "json" | "yaml" | "yml"));
        if !path.is_file() || !is_definition {
            continue;
        }
        let Some(storage) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        definitions.push((storage.to_string(), load_file(&path)?));
    }

    definitions.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(definitions)
}
