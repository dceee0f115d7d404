//! keyvalue - inspect and edit persistent and secure key-value stores
//!
//! Secure items go to the OS credential store. Hosts without one fall back
//! to an encrypted file, unlocked with `--passphrase`, the
//! `KEYVALUE_PASSPHRASE` variable, or an interactive prompt.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use tracing::info;

use keyvalue_cli::Command;
use keyvalue_core::{PersistentStore, SecureStore, Storage, StorageSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Persistent,
    Secure,
}

/// Typed key-value store access from the command line
#[derive(Parser, Debug)]
#[command(name = "keyvalue")]
#[command(author = "Symbia Labs")]
#[command(version)]
#[command(about = "Inspect and edit persistent and secure key-value stores")]
struct Args {
    /// Backend to operate on
    #[arg(long, value_enum, default_value = "persistent")]
    backend: Backend,

    /// Settings file (defaults apply when absent)
    #[arg(long, env = "KEYVALUE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Preference suite for the persistent backend
    #[arg(long)]
    suite: Option<String>,

    /// Secure service identifier
    #[arg(long)]
    service: Option<String>,

    /// Key prefix, overriding the settings file
    #[arg(long)]
    prefix: Option<String>,

    /// Passphrase for the encrypted-file fallback
    #[arg(long, env = "KEYVALUE_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let settings = match &args.settings {
        Some(path) => StorageSettings::load(path)
            .with_context(|| format!("Failed to load settings from {:?}", path))?,
        None => StorageSettings::default(),
    };

    let storage = open_storage(&args, settings)?;
    info!("Using {}", storage.backend_name());

    let mut stdout = std::io::stdout().lock();
    args.command.execute(storage.as_ref(), &mut stdout)
}

fn open_storage(args: &Args, mut settings: StorageSettings) -> Result<Arc<dyn Storage>> {
    match args.backend {
        Backend::Persistent => {
            let config = &mut settings.persistent;
            if args.suite.is_some() {
                config.suite_name = args.suite.clone();
            }
            if let Some(prefix) = &args.prefix {
                config.key_prefix = prefix.clone();
            }
            let store = PersistentStore::open(config).context("Failed to open preferences")?;
            Ok(Arc::new(store))
        }
        Backend::Secure => {
            let mut config = settings.secure;
            if args.service.is_some() {
                config.service = args.service.clone();
            }
            if let Some(prefix) = &args.prefix {
                config.key_prefix = prefix.clone();
            }

            let store = SecureStore::with_fallback(config, data_dir()?, || {
                match &args.passphrase {
                    Some(passphrase) => Ok(passphrase.clone()),
                    None => Ok(rpassword::prompt_password("Secure store passphrase: ")?),
                }
            })
            .context("Failed to open secure storage")?;

            Ok(Arc::new(store))
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "keyvalue")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("Could not determine data directory")
}
