//! Engine settings: which repository to open and where definitions live.
//!
//! Settings are merged field by field from four tiers:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/cfgstore/settings.yaml`
//! 3. **User** - `~/.cfgstore/settings.yaml`
//! 4. **Environment** - variables below
//!
//! ## Environment Variables
//! - `CFGSTORE_SETTINGS_PATH` - Explicit settings file (replaces project and user tiers)
//! - `CFGSTORE_PROJECT_DIR` - Project settings dir (default: `./cfgstore`)
//! - `CFGSTORE_USER_DIR` - User settings dir (default: `~/.cfgstore`)
//! - `CFGSTORE_REPOSITORY` - `file` or `database`
//! - `CFGSTORE_FILE` - Config document path
//! - `CFGSTORE_DB_PATH` - SQLite database path
//! - `CFGSTORE_TABLE` - Config table name
//! - `CFGSTORE_DEFINITIONS_DIR` - Definitions directory

mod loader;
mod merge;
mod types;

pub use loader::{SettingsLoader, SettingsPaths, SettingsTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
