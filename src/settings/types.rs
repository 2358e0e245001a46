//! Settings types.

use crate::db::Database;
use crate::error::RepositoryResult;
use crate::repository::{DEFAULT_TABLE, DbRepository, FileRepository, Repository};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub repository: RepositorySettings,

    #[serde(default)]
    pub definitions: DefinitionSettings,
}

/// Which repository adapter to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryKind {
    /// Whole-file JSON/YAML document (default)
    #[default]
    File,
    /// SQLite table
    Database,
}

impl RepositoryKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" => Some(RepositoryKind::File),
            "database" | "db" | "sqlite" => Some(RepositoryKind::Database),
            _ => None,
        }
    }
}

/// Repository location settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(default)]
    pub kind: RepositoryKind,

    /// Path of the config document for the file repository.
    #[serde(default = "default_file")]
    pub file: PathBuf,

    /// Path of the SQLite database for the database repository.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Config table name for the database repository.
    #[serde(default = "default_table")]
    pub table: String,

    /// Gzip the config document on write.
    #[serde(default)]
    pub gzip: bool,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            kind: RepositoryKind::default(),
            file: default_file(),
            database: default_database(),
            table: default_table(),
            gzip: false,
        }
    }
}

fn default_file() -> PathBuf {
    PathBuf::from("cfgstore/config.json")
}

fn default_database() -> PathBuf {
    PathBuf::from("cfgstore/config.db")
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

/// Where definition files are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionSettings {
    #[serde(default = "default_definitions_dir")]
    pub dir: PathBuf,
}

impl Default for DefinitionSettings {
    fn default() -> Self {
        Self {
            dir: default_definitions_dir(),
        }
    }
}

fn default_definitions_dir() -> PathBuf {
    PathBuf::from("cfgstore/definitions")
}

impl Settings {
    /// Build the configured repository adapter.
    ///
    /// Opening a database repository opens (or creates) the SQLite file and
    /// ensures the config table exists.
    pub fn open_repository(&self) -> RepositoryResult<Box<dyn Repository>> {
        let repo = &self.repository;
        match repo.kind {
            RepositoryKind::File => Ok(Box::new(
                FileRepository::new(&repo.file).with_gzip(repo.gzip),
            )),
            RepositoryKind::Database => {
                let db = Database::open(&repo.database)?;
                let repository = DbRepository::new(db, repo.table.clone());
                repository.ensure_table()?;
                Ok(Box::new(repository))
            }
        }
    }
}
