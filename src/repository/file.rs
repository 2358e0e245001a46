//! Whole-file repository backed by a JSON or YAML document.

use super::Repository;
use crate::error::{RepositoryError, RepositoryResult};
use crate::format::{DocumentFormat, is_gzip_path};
use crate::snapshot::ConfigFile;
use crate::types::Record;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads and writes every record as one [`ConfigFile`] document.
///
/// The encoding follows the file extension (`.yaml`/`.yml` or JSON); a `.gz`
/// suffix or [`FileRepository::with_gzip`] compresses on write. Compressed input
/// is detected on read regardless of the name. Writes replace the whole file and
/// are not atomic. [`Repository::prune`] rewrites the stored document minus the
/// pruned keys, so values filled in by reconciliation are never persisted.
#[derive(Debug, Clone, Default)]
pub struct FileRepository {
    path: Option<PathBuf>,
    gzip: bool,
}

impl FileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            gzip: false,
        }
    }

    /// Sets the file the config is loaded from and saved to.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// Force gzip compression on write.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn target(&self) -> RepositoryResult<&Path> {
        match self.path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(RepositoryError::MissingPath),
        }
    }

    fn compress(&self, path: &Path) -> bool {
        self.gzip || is_gzip_path(path)
    }

    /// Open and decode the document at `path`.
    ///
    /// Existence and readability are established before any content is read.
    fn read_document(&self, path: &Path) -> RepositoryResult<ConfigFile> {
        if !path.exists() {
            return Err(RepositoryError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(RepositoryError::Unreadable(path.to_path_buf()));
        }

        let mut handle = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => RepositoryError::Unreadable(path.to_path_buf()),
            _ => RepositoryError::io(path, e),
        })?;

        let mut bytes = Vec::new();
        handle
            .read_to_end(&mut bytes)
            .map_err(|e| RepositoryError::io(path, e))?;

        ConfigFile::decode(&bytes, DocumentFormat::from_path(path), &path.display().to_string())
    }

    fn write_document(&self, path: &Path, file: &ConfigFile) -> RepositoryResult<()> {
        let bytes = file.encode(DocumentFormat::from_path(path), self.compress(path))?;
        std::fs::write(path, bytes).map_err(|e| RepositoryError::io(path, e))
    }
}

impl Repository for FileRepository {
    fn read(&self) -> RepositoryResult<Vec<Record>> {
        let path = self.target()?;
        let source_name = path.display().to_string();
        let records = self.read_document(path)?.records(&source_name)?;
        debug!(path = %source_name, records = records.len(), "read config file");
        Ok(records)
    }

    fn write(&self, records: &[Record]) -> RepositoryResult<()> {
        let path = self.target()?;
        self.write_document(path, &ConfigFile::from_records(records))?;
        debug!(path = %path.display(), records = records.len(), "wrote config file");
        Ok(())
    }

    /// Remove keys from the stored document, leaving every other entry as it was.
    fn prune(&self, storage: &str, keys: &[String]) -> RepositoryResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let path = self.target()?;
        let stored = self.read_document(path)?;

        let mut storages = stored.storages;
        let removed = match storages.get_mut(storage) {
            Some(entries) => keys
                .iter()
                .filter(|key| entries.remove(key.as_str()).is_some())
                .count(),
            None => 0,
        };
        if removed == 0 {
            return Ok(0);
        }
        if storages.get(storage).is_some_and(|entries| entries.is_empty()) {
            storages.remove(storage);
        }

        let file = ConfigFile {
            storages,
            ..ConfigFile::new()
        };
        self.write_document(path, &file)?;
        debug!(path = %path.display(), storage, removed, "pruned config file entries");
        Ok(removed)
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("file {}", path.display()),
            None => "file (unset)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_is_checked_first() {
        let repo = FileRepository::default();
        assert!(matches!(repo.read(), Err(RepositoryError::MissingPath)));
        assert!(matches!(repo.write(&[]), Err(RepositoryError::MissingPath)));

        let repo = FileRepository::new("");
        assert!(matches!(repo.read(), Err(RepositoryError::MissingPath)));
    }

    #[test]
    fn test_nonexistent_file() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path().join("absent.json"));
        assert!(matches!(repo.read(), Err(RepositoryError::NotFound(_))));
    }

    #[test]
    fn test_directory_is_unreadable() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path());
        assert!(matches!(repo.read(), Err(RepositoryError::Unreadable(_))));
    }

    #[test]
    fn test_write_into_missing_directory_surfaces_io_error() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path().join("no/such/dir/config.json"));
        let err = repo.write(&[Record::new("app", "k", "v").unwrap()]).unwrap_err();
        assert!(matches!(err, RepositoryError::Io { .. }));
    }

    #[test]
    fn test_write_then_read_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let repo = FileRepository::new(&path);

        repo.write(&[
            Record::new("app", "name", "demo").unwrap(),
            Record::new("app", "retries", 3).unwrap(),
        ])
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("format_version: 1"));

        let records = repo.read().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key(), "name");
        assert_eq!(records[1].value(), &json!(3));
    }

    #[test]
    fn test_gzip_by_extension_and_flag() {
        let temp = TempDir::new().unwrap();
        let by_name = FileRepository::new(temp.path().join("config.json.gz"));
        let by_flag = FileRepository::new(temp.path().join("config.json")).with_gzip(true);
        let records = vec![Record::new("app", "k", "v").unwrap()];

        for repo in [by_name, by_flag] {
            repo.write(&records).unwrap();
            let raw = std::fs::read(repo.path().unwrap()).unwrap();
            assert_eq!(&raw[..2], &[0x1f, 0x8b]);
            assert_eq!(repo.read().unwrap(), records);
        }
    }

    #[test]
    fn test_prune_rewrites_only_stored_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        let repo = FileRepository::new(&path);
        repo.write(&[
            Record::new("app", "legacy", "x").unwrap(),
            Record::new("app", "name", "demo").unwrap(),
            Record::new("web", "legacy", "keep").unwrap(),
        ])
        .unwrap();

        let removed = repo
            .prune("app", &["legacy".to_string(), "absent".to_string()])
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            repo.read().unwrap(),
            vec![
                Record::new("app", "name", "demo").unwrap(),
                Record::new("web", "legacy", "keep").unwrap(),
            ]
        );
    }

    #[test]
    fn test_prune_drops_emptied_storage() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path().join("config.yaml"));
        repo.write(&[Record::new("app", "legacy", "x").unwrap()]).unwrap();

        assert_eq!(repo.prune("app", &["legacy".to_string()]).unwrap(), 1);
        assert!(repo.read().unwrap().is_empty());
        assert_eq!(repo.prune("app", &["legacy".to_string()]).unwrap(), 0);
    }

    #[test]
    fn test_prune_missing_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path().join("absent.json"));
        let err = repo.prune("app", &["k".to_string()]).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_detected_on_open() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"app": {"k": "v"}}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can open the file regardless of its mode
        if File::open(&path).is_ok() {
            return;
        }
        let err = FileRepository::new(&path).read().unwrap_err();
        assert!(matches!(err, RepositoryError::Unreadable(_)));
    }
}
