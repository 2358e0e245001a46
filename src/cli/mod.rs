//! CLI command definitions for cfgstore
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod export;

use crate::format::OutputFormat;
use crate::settings::{RepositoryKind, Settings};
use clap::{Args, Parser, Subcommand, ValueEnum};
use export::ExportArgs;
use std::path::PathBuf;

/// Output format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatArg {
    #[default]
    Json,
    Yaml,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Yaml => OutputFormat::Yaml,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

/// Inspect, resolve and export configuration storages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to settings file (replaces project and user settings)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Read configuration from this JSON/YAML document
    #[arg(short, long, global = true, conflicts_with = "database")]
    pub file: Option<PathBuf>,

    /// Read configuration from this SQLite database
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Config table name (database repository)
    #[arg(short, long, global = true)]
    pub table: Option<String>,

    /// Directory of `<storage>.yaml|json` definition files
    #[arg(long, global = true)]
    pub definitions: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = FormatArg::Json, global = true)]
    pub format: FormatArg,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(ref file) = self.file {
            settings.repository.kind = RepositoryKind::File;
            settings.repository.file = file.clone();
        }
        if let Some(ref database) = self.database {
            settings.repository.kind = RepositoryKind::Database;
            settings.repository.database = database.clone();
        }
        if let Some(ref table) = self.table {
            settings.repository.table = table.clone();
        }
        if let Some(ref dir) = self.definitions {
            settings.definitions.dir = dir.clone();
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print one storage, or every storage, after applying definitions
    Dump {
        /// Storage name (default: all storages)
        storage: Option<String>,
    },

    /// Print a value, or a whole storage when KEY is omitted
    Get {
        storage: String,
        key: Option<String>,
    },

    /// Check whether a storage or key is set (exit code 1 if not)
    Exists {
        storage: String,
        key: Option<String>,
    },

    /// Apply a definition file to a storage and print the result
    Resolve(ResolveArgs),

    /// Write every storage to a JSON/YAML document
    Export(ExportArgs),

    /// Remove keys that the storage's definition no longer declares
    Prune {
        storage: String,
    },
}

/// Arguments for the resolve subcommand
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Storage to resolve
    pub storage: String,

    /// Definition file (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub definition: PathBuf,

    /// Also print the flattened control structure
    #[arg(long)]
    pub structure: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_with_globals() {
        let cli = Cli::parse_from(["cfgstore", "get", "app", "db.host", "--table", "cfg", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.table.as_deref(), Some("cfg"));
        match cli.command {
            Command::Get { storage, key } => {
                assert_eq!(storage, "app");
                assert_eq!(key.as_deref(), Some("db.host"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_file_and_database_conflict() {
        let result = Cli::try_parse_from(["cfgstore", "--file", "a.json", "--database", "a.db", "dump"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_select_repository() {
        let cli = Cli::parse_from(["cfgstore", "--database", "x.db", "dump"]);
        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.repository.kind, RepositoryKind::Database);
        assert_eq!(settings.repository.database, PathBuf::from("x.db"));
    }

    #[test]
    fn test_resolve_args() {
        let cli = Cli::parse_from([
            "cfgstore", "--format", "yaml", "resolve", "app", "--definition", "app.yaml", "--structure",
        ]);
        assert_eq!(OutputFormat::from(cli.format), OutputFormat::Yaml);
        let Command::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.definition, PathBuf::from("app.yaml"));
        assert!(args.structure);
    }
}
