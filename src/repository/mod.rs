//! Pluggable persistence for configuration records.
//!
//! A repository hands the registry an unordered batch of `(storage, key, value)`
//! records and optionally persists the inverse. Two adapters ship with the crate:
//! - [`DbRepository`] - a relational table in SQLite
//! - [`FileRepository`] - a single JSON or YAML document, optionally gzipped

mod database;
mod file;

pub use database::{DEFAULT_TABLE, DbRepository, is_valid_table_name};
pub use file::FileRepository;

use crate::error::RepositoryResult;
use crate::types::Record;

/// Source and sink of configuration records.
///
/// Adapters check their preconditions (handle set, resource named) before
/// attempting any I/O and surface the first failure without retrying.
pub trait Repository {
    /// Read every stored record.
    fn read(&self) -> RepositoryResult<Vec<Record>>;

    /// Persist the full dataset, replacing what the backing resource holds.
    fn write(&self, records: &[Record]) -> RepositoryResult<()>;

    /// Delete `keys` of `storage` from the backing resource.
    ///
    /// Returns the number of entries removed. Adapters that persist by full
    /// overwrite do not need to implement this.
    fn prune(&self, _storage: &str, _keys: &[String]) -> RepositoryResult<usize> {
        Ok(0)
    }

    /// Short description of the backing resource, for log lines.
    fn describe(&self) -> String;
}
