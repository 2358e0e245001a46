//! Relational repository backed by a SQLite table.

use super::Repository;
use crate::db::Database;
use crate::error::{RepositoryError, RepositoryResult};
use crate::types::Record;
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Default name of the config table.
pub const DEFAULT_TABLE: &str = "config";

static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is valid")
});

/// Whether `name` can be interpolated into SQL as a table name.
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

/// Reads config rows `(storage, id, value)` from a table.
///
/// Writing the full dataset back is not supported: [`Repository::write`] is a
/// no-op. Individual rows can be inserted with [`DbRepository::insert`] and
/// obsolete rows removed with [`Repository::prune`].
#[derive(Debug, Clone, Default)]
pub struct DbRepository {
    db: Option<Database>,
    table: String,
}

impl DbRepository {
    pub fn new(db: Database, table: impl Into<String>) -> Self {
        Self {
            db: Some(db),
            table: table.into(),
        }
    }

    pub fn set_database(&mut self, db: Database) {
        self.db = Some(db);
    }

    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = table.into();
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Check the handle and table name before touching the database.
    fn target(&self) -> RepositoryResult<(&Database, &str)> {
        let db = self.db.as_ref().ok_or(RepositoryError::MissingConnection)?;
        if self.table.is_empty() {
            return Err(RepositoryError::MissingTable);
        }
        if !is_valid_table_name(&self.table) {
            return Err(RepositoryError::InvalidTable(self.table.clone()));
        }
        Ok((db, &self.table))
    }

    /// Create the config table if it is missing.
    pub fn ensure_table(&self) -> RepositoryResult<()> {
        let (db, table) = self.target()?;
        db.create_config_table(table)
    }

    /// Insert or replace a single row.
    pub fn insert(&self, record: &Record) -> RepositoryResult<()> {
        let (db, table) = self.target()?;
        db.upsert_record(table, record)
    }
}

impl Repository for DbRepository {
    fn read(&self) -> RepositoryResult<Vec<Record>> {
        let (db, table) = self.target()?;
        let records = db.select_records(table)?;
        debug!(table, records = records.len(), "read config table");
        Ok(records)
    }

    fn write(&self, records: &[Record]) -> RepositoryResult<()> {
        debug!(
            table = %self.table,
            records = records.len(),
            "database repository does not persist full datasets; write skipped"
        );
        Ok(())
    }

    fn prune(&self, storage: &str, keys: &[String]) -> RepositoryResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let (db, table) = self.target()?;
        let removed = db.delete_records(table, storage, keys)?;
        debug!(table, storage, removed, "pruned config rows");
        Ok(removed)
    }

    fn describe(&self) -> String {
        format!("database table {}", self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("config"));
        assert!(is_valid_table_name("_app_config2"));
        assert!(!is_valid_table_name("2config"));
        assert!(!is_valid_table_name("config; DROP TABLE x"));
        assert!(!is_valid_table_name("main.config"));
        assert!(!is_valid_table_name(""));
    }

    #[test]
    fn test_read_without_connection() {
        let mut repo = DbRepository::default();
        repo.set_table("config");
        assert!(matches!(repo.read(), Err(RepositoryError::MissingConnection)));
    }

    #[test]
    fn test_read_without_table() {
        let repo = DbRepository::new(Database::open_in_memory().unwrap(), "");
        assert!(matches!(repo.read(), Err(RepositoryError::MissingTable)));
    }

    #[test]
    fn test_read_rejects_unsafe_table() {
        let repo = DbRepository::new(Database::open_in_memory().unwrap(), "config--");
        assert!(matches!(repo.read(), Err(RepositoryError::InvalidTable(_))));
    }

    #[test]
    fn test_write_is_noop() {
        let repo = DbRepository::new(Database::open_in_memory().unwrap(), DEFAULT_TABLE);
        repo.ensure_table().unwrap();
        repo.write(&[Record::new("app", "k", "v").unwrap()]).unwrap();
        assert!(repo.read().unwrap().is_empty());
    }
}
