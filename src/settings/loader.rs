//! Settings loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::{RepositoryKind, Settings};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the settings file inside a tier directory.
pub const SETTINGS_FILE: &str = "settings.yaml";

/// Settings tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingsTier {
    /// Compiled-in defaults (lowest priority)
    Defaults = 0,
    /// Project-level settings ($CWD/cfgstore/)
    Project = 1,
    /// User-level settings (~/.cfgstore/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for SettingsTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsTier::Defaults => write!(f, "defaults"),
            SettingsTier::Project => write!(f, "project"),
            SettingsTier::User => write!(f, "user"),
            SettingsTier::Environment => write!(f, "environment"),
        }
    }
}

/// Where each settings tier lives.
#[derive(Debug, Clone, Default)]
pub struct SettingsPaths {
    /// Explicit settings file; replaces the project and user tiers
    pub explicit: Option<PathBuf>,
    /// Project-level settings directory
    pub project_dir: Option<PathBuf>,
    /// User-level settings directory
    pub user_dir: Option<PathBuf>,
}

impl SettingsPaths {
    /// Discover tier locations from the environment and the home directory.
    pub fn discover() -> Self {
        let explicit = std::env::var("CFGSTORE_SETTINGS_PATH")
            .ok()
            .map(PathBuf::from);

        let project_dir = std::env::var("CFGSTORE_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("cfgstore")));

        let user_dir = std::env::var("CFGSTORE_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".cfgstore")));

        Self {
            explicit,
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit tier directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            explicit: None,
            project_dir,
            user_dir,
        }
    }

    /// Use a single settings file instead of the project and user tiers.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }
}

/// Loads [`Settings`] by merging every tier.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    paths: SettingsPaths,
    settings: Settings,
    /// Files that contributed, lowest tier first
    sources: Vec<(SettingsTier, PathBuf)>,
}

impl SettingsLoader {
    /// Load settings from discovered tiers and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(SettingsPaths::discover(), |name| std::env::var(name).ok())
    }

    /// Load settings from explicit tier paths and the process environment.
    pub fn load_with_paths(paths: SettingsPaths) -> Result<Self> {
        Self::load_with(paths, |name| std::env::var(name).ok())
    }

    /// Load settings with an explicit environment lookup.
    pub fn load_with<F>(paths: SettingsPaths, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tiers: Vec<Value> = Vec::new();
        let mut sources = Vec::new();

        // Tier 1: Defaults
        tiers.push(serde_json::to_value(Settings::default())?);

        if let Some(ref explicit) = paths.explicit {
            // An explicit file must exist; tier files are optional
            let value = read_settings_file(explicit)
                .with_context(|| format!("failed to load settings from {}", explicit.display()))?;
            tiers.push(value);
            sources.push((SettingsTier::Project, explicit.clone()));
        } else {
            // Tiers 2 and 3: Project, then user
            for (tier, dir) in [
                (SettingsTier::Project, &paths.project_dir),
                (SettingsTier::User, &paths.user_dir),
            ] {
                let Some(dir) = dir else { continue };
                let file = dir.join(SETTINGS_FILE);
                if !file.exists() {
                    continue;
                }
                match read_settings_file(&file) {
                    Ok(value) => {
                        tiers.push(value);
                        sources.push((tier, file));
                    }
                    Err(e) => warn!(tier = %tier, path = %file.display(), "skipping settings file: {:#}", e),
                }
            }
        }

        let merged = deep_merge_all(tiers);
        let mut settings: Settings =
            serde_json::from_value(merged).context("invalid merged settings")?;

        // Tier 4: Environment
        apply_env_overrides(&mut settings, env)?;

        debug!(sources = sources.len(), kind = ?settings.repository.kind, "loaded settings");
        Ok(Self {
            paths,
            settings,
            sources,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    pub fn paths(&self) -> &SettingsPaths {
        &self.paths
    }

    /// Settings files that were merged, lowest tier first.
    pub fn sources(&self) -> &[(SettingsTier, PathBuf)] {
        &self.sources
    }
}

/// Parse one settings file as YAML (JSON is valid YAML).
fn read_settings_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_yaml::from_str::<Value>(&content)?)
}

/// Apply `CFGSTORE_*` overrides on top of the merged settings.
fn apply_env_overrides<F>(settings: &mut Settings, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(kind) = env("CFGSTORE_REPOSITORY") {
        settings.repository.kind = RepositoryKind::from_str(&kind)
            .with_context(|| format!("CFGSTORE_REPOSITORY: unknown repository kind {:?}", kind))?;
    }

    if let Some(file) = env("CFGSTORE_FILE") {
        settings.repository.file = PathBuf::from(file);
    }

    if let Some(database) = env("CFGSTORE_DB_PATH") {
        settings.repository.database = PathBuf::from(database);
    }

    if let Some(table) = env("CFGSTORE_TABLE") {
        settings.repository.table = table;
    }

    if let Some(dir) = env("CFGSTORE_DEFINITIONS_DIR") {
        settings.definitions.dir = PathBuf::from(dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = SettingsPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = SettingsLoader::load_with(paths, no_env).unwrap();
        assert_eq!(loader.settings(), &Settings::default());
        assert!(loader.sources().is_empty());
    }

    #[test]
    fn test_user_overrides_project_field_by_field() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        let user = temp.path().join("user");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::create_dir_all(&user).unwrap();

        std::fs::write(
            project.join(SETTINGS_FILE),
            "repository:\n  kind: database\n  table: project_config\n",
        )
        .unwrap();
        std::fs::write(user.join(SETTINGS_FILE), "repository:\n  table: user_config\n").unwrap();

        let loader =
            SettingsLoader::load_with(SettingsPaths::with_dirs(Some(project), Some(user)), no_env)
                .unwrap();
        let settings = loader.settings();

        assert_eq!(settings.repository.kind, RepositoryKind::Database);
        assert_eq!(settings.repository.table, "user_config");
        assert_eq!(loader.sources().len(), 2);
        assert_eq!(loader.sources()[0].0, SettingsTier::Project);
    }

    #[test]
    fn test_malformed_tier_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join(SETTINGS_FILE), "repository: [unclosed").unwrap();

        let loader =
            SettingsLoader::load_with(SettingsPaths::with_dirs(Some(project), None), no_env)
                .unwrap();
        assert_eq!(loader.settings(), &Settings::default());
    }

    #[test]
    fn test_explicit_file_replaces_tiers_and_must_exist() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join(SETTINGS_FILE), "repository:\n  table: ignored\n").unwrap();
        let explicit = temp.path().join("explicit.yaml");
        std::fs::write(&explicit, "definitions:\n  dir: /etc/defs\n").unwrap();

        let paths = SettingsPaths::with_dirs(Some(project), None).with_explicit(&explicit);
        let settings = SettingsLoader::load_with(paths, no_env)
            .unwrap()
            .into_settings();
        assert_eq!(settings.repository.table, "config");
        assert_eq!(settings.definitions.dir, PathBuf::from("/etc/defs"));

        let missing = SettingsPaths::default().with_explicit(temp.path().join("nope.yaml"));
        assert!(SettingsLoader::load_with(missing, no_env).is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CFGSTORE_REPOSITORY", "db"),
            ("CFGSTORE_DB_PATH", "/tmp/c.db"),
            ("CFGSTORE_TABLE", "settings"),
            ("CFGSTORE_DEFINITIONS_DIR", "defs"),
        ]);
        let settings = SettingsLoader::load_with(SettingsPaths::default(), |name| {
            env.get(name).map(|v| v.to_string())
        })
        .unwrap()
        .into_settings();

        assert_eq!(settings.repository.kind, RepositoryKind::Database);
        assert_eq!(settings.repository.database, PathBuf::from("/tmp/c.db"));
        assert_eq!(settings.repository.table, "settings");
        assert_eq!(settings.definitions.dir, PathBuf::from("defs"));
    }

    #[test]
    fn test_overrides_applied_through_settings_mut() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        let paths = SettingsPaths::with_dirs(Some(project.clone()), None);

        let mut loader = SettingsLoader::load_with(paths, no_env).unwrap();
        loader.settings_mut().repository.kind = RepositoryKind::Database;
        loader.settings_mut().repository.table = "cli_table".to_string();

        assert_eq!(loader.paths().project_dir.as_deref(), Some(project.as_path()));
        let settings = loader.into_settings();
        assert_eq!(settings.repository.kind, RepositoryKind::Database);
        assert_eq!(settings.repository.table, "cli_table");
    }

    #[test]
    fn test_unknown_repository_kind_from_env() {
        let result = SettingsLoader::load_with(SettingsPaths::default(), |name| {
            (name == "CFGSTORE_REPOSITORY").then(|| "redis".to_string())
        });
        assert!(result.is_err());
    }
}
