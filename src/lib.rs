//! Hierarchical configuration resolution.
//!
//! A [`Config`] registry holds named [`Storage`]s loaded from a
//! [`repository::Repository`]. Applying a [`Definition`] to a storage fills
//! in declared keys with their defaults, decodes serialized values, and
//! records the flattened control structure. [`Cfg`] is a thin read-only
//! facade bound to one storage.

pub mod cli;
pub mod db;
pub mod definition;
pub mod error;
pub mod facade;
pub mod format;
pub mod logging;
pub mod registry;
pub mod repository;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod types;

pub use definition::{Control, Definition};
pub use error::{ConfigError, Error, RepositoryError, Result};
pub use facade::Cfg;
pub use registry::{Config, Lookup};
pub use storage::Storage;
pub use types::Record;
