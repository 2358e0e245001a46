//! Config table operations.
//!
//! Every function takes the table name as an already validated SQL identifier;
//! it is interpolated into the statement text.

use super::Database;
use crate::error::{RepositoryError, RepositoryResult};
use crate::types::Record;
use rusqlite::params;
use rusqlite::types::ValueRef;
use serde_json::Value;

/// Decode a SQLite column into a config value.
fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(String::from_utf8_lossy(blob).into_owned()),
    }
}

/// Encode a config value for the TEXT `value` column.
fn value_to_sql(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl Database {
    /// Create the config table if it does not exist.
    pub fn create_config_table(&self, table: &str) -> RepositoryResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    storage TEXT NOT NULL,
                    id TEXT NOT NULL,
                    value TEXT,
                    PRIMARY KEY (storage, id)
                )"
            ))?;
            Ok(())
        })
    }

    /// Read all records ordered by storage, then key.
    pub fn select_records(&self, table: &str) -> RepositoryResult<Vec<Record>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT storage, id, value FROM {table} ORDER BY storage, id"
            ))?;

            let rows = stmt.query_map([], |row| {
                let storage: String = row.get(0)?;
                let id: String = row.get(1)?;
                let value = value_from_sql(row.get_ref(2)?);
                Ok((storage, id, value))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (storage, id, value) = row?;
                let record = Record::new(storage, id, value)
                    .map_err(|e| RepositoryError::decode(format!("table {table}"), e))?;
                records.push(record);
            }
            Ok(records)
        })
    }

    /// Insert a record, replacing any row with the same storage and key.
    pub fn upsert_record(&self, table: &str, record: &Record) -> RepositoryResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (storage, id, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(storage, id) DO UPDATE SET value = excluded.value"
                ),
                params![record.storage(), record.key(), value_to_sql(record.value())],
            )?;
            Ok(())
        })
    }

    /// Delete the given keys of one storage in a single transaction.
    ///
    /// Returns the number of rows removed.
    pub fn delete_records(&self, table: &str, storage: &str, keys: &[String]) -> RepositoryResult<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            {
                let mut stmt =
                    tx.prepare(&format!("DELETE FROM {table} WHERE storage = ?1 AND id = ?2"))?;
                for key in keys {
                    removed += stmt.execute(params![storage, key])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        })
    }
}
