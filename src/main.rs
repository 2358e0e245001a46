//! cfgstore command-line tool
//!
//! Loads configuration through the configured repository, reconciles each
//! storage against its definition file, and prints or exports the result.

use anyhow::{Context, Result};
use cfgstore::cli::export::ExportArgs;
use cfgstore::cli::{Cli, Command, ResolveArgs};
use cfgstore::definition;
use cfgstore::format::{OutputFormat, render_storage, render_value};
use cfgstore::logging::{self, LogTarget};
use cfgstore::repository::{FileRepository, Repository};
use cfgstore::settings::{Settings, SettingsLoader, SettingsPaths};
use cfgstore::{Config, Storage};
use clap::Parser;
use serde_json::Value;
use std::process::ExitCode;
use tracing::{debug, info};

/// Load settings, honoring `--settings` and the other repository flags.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut loader = match cli.settings {
        Some(ref explicit) => {
            SettingsLoader::load_with_paths(SettingsPaths::discover().with_explicit(explicit))?
        }
        None => SettingsLoader::load()?,
    };
    cli.apply_overrides(loader.settings_mut());

    for (tier, path) in loader.sources() {
        debug!(tier = %tier, path = %path.display(), "merged settings file");
    }
    if loader.sources().is_empty() {
        let paths = loader.paths();
        debug!(
            project = ?paths.project_dir,
            user = ?paths.user_dir,
            "no settings files found, using defaults"
        );
    }
    Ok(loader.into_settings())
}

/// Open the repository, load every record and apply the definitions directory.
fn open_config(settings: &Settings) -> Result<Config> {
    let repository = settings
        .open_repository()
        .context("failed to open config repository")?;
    let mut config = Config::new(repository);
    config.load()?;

    let definitions = definition::load_dir(&settings.definitions.dir)?;
    for (storage, tree) in definitions {
        debug!(storage = %storage, "applying definition file");
        config.apply_definition(&storage, tree);
    }
    Ok(config)
}

fn print_storage(storage: &Storage, format: OutputFormat) -> Result<()> {
    let rendered = render_storage(storage, format)?;
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    let rendered = render_value(value, format)?;
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn run_dump(config: &Config, storage: Option<&str>, format: OutputFormat) -> Result<()> {
    match storage {
        Some(name) => print_storage(config.get_storage(name)?, format),
        None if format == OutputFormat::Markdown => {
            for storage in config.storages() {
                print_storage(storage, format)?;
                println!();
            }
            Ok(())
        }
        None => {
            let all: serde_json::Map<String, Value> = config
                .storages()
                .map(|s| {
                    let data = s
                        .data()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    (s.name().to_string(), Value::Object(data))
                })
                .collect();
            print_value(&Value::Object(all), format)
        }
    }
}

fn run_resolve(config: &mut Config, args: &ResolveArgs, format: OutputFormat) -> Result<()> {
    let tree = definition::load_file(&args.definition)?;
    let storage = config.apply_definition(&args.storage, tree);
    print_storage(storage, format)?;

    if args.structure && format != OutputFormat::Markdown {
        let structure = serde_json::to_value(storage.structure())?;
        print_value(&structure, format)?;
    }
    Ok(())
}

fn run_export(config: &mut Config, args: &ExportArgs) -> Result<()> {
    if args.defined_only {
        let names: Vec<String> = config.storage_names().map(str::to_string).collect();
        for name in names {
            let storage = config.get_storage_mut(&name)?;
            for key in storage.obsolete_keys() {
                storage.remove(&key);
            }
        }
    }

    let mut records = Vec::new();
    for storage in config.storages().filter(|s| args.includes(s.name())) {
        records.extend(storage.to_records()?);
    }

    let target = FileRepository::new(&args.output).with_gzip(args.should_compress());
    target.write(&records)?;
    info!(
        records = records.len(),
        output = %args.output.display(),
        "exported configuration"
    );
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings = load_settings(&cli)?;
    let format = OutputFormat::from(cli.format);
    let mut config = open_config(&settings)?;

    match cli.command {
        Command::Dump { ref storage } => run_dump(&config, storage.as_deref(), format)?,
        Command::Get { ref storage, ref key } => {
            let lookup = config.get(storage, key.as_deref().unwrap_or_default())?;
            print_value(&lookup.to_value(), format)?;
        }
        Command::Exists { ref storage, ref key } => {
            let exists = config.exists(storage, key.as_deref());
            println!("{}", exists);
            if !exists {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Resolve(ref args) => run_resolve(&mut config, args, format)?,
        Command::Export(ref args) => run_export(&mut config, args)?,
        Command::Prune { ref storage } => {
            let removed = config.prune(storage)?;
            if removed.is_empty() {
                println!("nothing to prune in {}", storage);
            } else {
                print_value(&Value::from(removed), format)?;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;
    run(cli)
}
