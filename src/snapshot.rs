//! On-disk document holding every storage of a registry.
//!
//! The document is a whole-file dump: readers decode all of it, writers replace
//! all of it. JSON and YAML encodings are supported, either optionally gzipped.

use crate::error::{RepositoryError, RepositoryResult};
use crate::format::DocumentFormat;
use crate::types::Record;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Version of the document layout written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Storage name to flat key/value map.
pub type StorageMap = BTreeMap<String, BTreeMap<String, Value>>;

/// A full dump of configuration records grouped by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Document layout version
    pub format_version: u32,

    /// RFC 3339 timestamp of the write
    #[serde(default)]
    pub written_at: String,

    /// Tool name and version that wrote the document
    #[serde(default)]
    pub written_by: String,

    /// Values keyed by storage name, then key
    #[serde(default)]
    pub storages: StorageMap,
}

/// Accepted document shapes: the envelope, or a bare storage map.
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Envelope(ConfigFile),
    Bare(StorageMap),
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFile {
    /// Create an empty document stamped with the current time.
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            written_at: chrono::Utc::now().to_rfc3339(),
            written_by: format!("cfgstore v{}", env!("CARGO_PKG_VERSION")),
            storages: BTreeMap::new(),
        }
    }

    /// Group records by storage. Later records win on duplicate keys.
    pub fn from_records(records: &[Record]) -> Self {
        let mut file = Self::new();
        for record in records {
            file.storages
                .entry(record.storage().to_string())
                .or_default()
                .insert(record.key().to_string(), record.value().clone());
        }
        file
    }

    /// Flatten back into records, ordered by storage then key.
    pub fn records(&self, source_name: &str) -> RepositoryResult<Vec<Record>> {
        let mut records = Vec::with_capacity(self.record_count());
        for (storage, entries) in &self.storages {
            for (key, value) in entries {
                let record = Record::new(storage.as_str(), key.as_str(), value.clone())
                    .map_err(|e| RepositoryError::decode(source_name, e))?;
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn record_count(&self) -> usize {
        self.storages.values().map(BTreeMap::len).sum()
    }

    /// Decode a document, transparently inflating gzip input.
    pub fn decode(bytes: &[u8], format: DocumentFormat, source_name: &str) -> RepositoryResult<Self> {
        let inflated;
        let bytes = if bytes.starts_with(&GZIP_MAGIC) {
            let mut buf = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut buf)
                .map_err(|e| RepositoryError::decode(source_name, e))?;
            inflated = buf;
            inflated.as_slice()
        } else {
            bytes
        };

        let text =
            std::str::from_utf8(bytes).map_err(|e| RepositoryError::decode(source_name, e))?;
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        let document: Document = match format {
            DocumentFormat::Json => {
                serde_json::from_str(text).map_err(|e| RepositoryError::decode(source_name, e))?
            }
            DocumentFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| RepositoryError::decode(source_name, e))?
            }
        };

        match document {
            Document::Envelope(file) if file.format_version > FORMAT_VERSION => {
                Err(RepositoryError::decode(
                    source_name,
                    format!(
                        "format version {} is newer than supported version {}",
                        file.format_version, FORMAT_VERSION
                    ),
                ))
            }
            Document::Envelope(file) => Ok(file),
            Document::Bare(storages) => Ok(Self {
                storages,
                ..Self::new()
            }),
        }
    }

    /// Encode the document, optionally gzip-compressed.
    pub fn encode(&self, format: DocumentFormat, gzip: bool) -> RepositoryResult<Vec<u8>> {
        let text = match format {
            DocumentFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| RepositoryError::Encode(e.to_string()))?,
            DocumentFormat::Yaml => {
                serde_yaml::to_string(self).map_err(|e| RepositoryError::Encode(e.to_string()))?
            }
        };

        if !gzip {
            return Ok(text.into_bytes());
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(text.as_bytes())
            .map_err(|e| RepositoryError::Encode(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| RepositoryError::Encode(e.to_string()))
    }
}
