//! Export subcommand for the cfgstore CLI
//!
//! Reads every record through the configured repository, reconciles the
//! storages against their definitions, and writes them to a document that
//! the file repository can load back.

use crate::format::is_gzip_path;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the export subcommand
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file path (`.yaml`/`.yml` for YAML, anything else JSON)
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Force gzip compression (auto-detected from .gz extension otherwise)
    #[arg(long)]
    pub gzip: bool,

    /// Comma-separated list of storages to export (default: all)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub storages: Option<Vec<String>>,

    /// Drop keys not declared by any definition before exporting
    #[arg(long)]
    pub defined_only: bool,
}

impl ExportArgs {
    /// Determine if output should be compressed based on args and filename
    pub fn should_compress(&self) -> bool {
        self.gzip || is_gzip_path(&self.output)
    }

    /// Whether a storage is selected for export
    pub fn includes(&self, storage: &str) -> bool {
        self.storages
            .as_ref()
            .is_none_or(|list| list.iter().any(|s| s == storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(output: &str) -> ExportArgs {
        ExportArgs {
            output: PathBuf::from(output),
            gzip: false,
            storages: None,
            defined_only: false,
        }
    }

    #[test]
    fn test_should_compress() {
        assert!(args("out.json.gz").should_compress());
        assert!(!args("out.json").should_compress());

        let mut forced = args("out.json");
        forced.gzip = true;
        assert!(forced.should_compress());
    }

    #[test]
    fn test_includes() {
        let mut a = args("out.json");
        assert!(a.includes("anything"));

        a.storages = Some(vec!["app".to_string(), "web".to_string()]);
        assert!(a.includes("web"));
        assert!(!a.includes("db"));
    }
}
