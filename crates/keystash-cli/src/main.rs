//! Keystash CLI - read and write a configured stash from the shell.
//!
//! Loads the layered configuration, binds the configured backends to their
//! slots, and runs one operation through the async facade.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use keystash::{RequestContext, Slot, StashOptions};
use keystash_cli::bridge;
use keystash_cli::commands::{config, stash};
use keystash_config::{Config, ShowFormat};
use stash::ValueKind;

/// Keystash - runtime-routed key/value storage
#[derive(Parser)]
#[command(name = "keystash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "KEYSTASH_CONFIG")]
    config: Option<PathBuf>,

    /// Namespace identifier (overrides `stash.id`)
    #[arg(long, global = true)]
    id: Option<String>,

    /// Route every call to this slot (overrides `stash.force_backend`)
    #[arg(short, long, global = true, value_parser = parse_slot)]
    backend: Option<Slot>,

    /// Incoming `Cookie` header for the cookie backend
    #[arg(long, global = true)]
    cookie: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get {
        /// Key to read
        key: String,

        /// How to read the value
        #[arg(long = "as", value_enum, default_value_t)]
        kind: ValueKind,

        /// Value to print when the key is absent (JSON, or plain text)
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Store a value under a key
    Set {
        /// Key to write
        key: String,

        /// Value to store
        value: String,

        /// How to parse the value
        #[arg(long = "as", value_enum, default_value_t)]
        kind: ValueKind,

        /// Cookie `Max-Age` in seconds
        #[arg(long)]
        max_age: Option<u64>,
    },

    /// Remove a key
    Delete {
        /// Key to remove
        key: String,
    },

    /// Erase every key in the namespace
    Clear,

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration with source annotations
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
    },
    /// Print the user config file path
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Toml,
    Json,
}

impl From<OutputFormat> for ShowFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Toml => Self::Toml,
            OutputFormat::Json => Self::Json,
        }
    }
}

fn parse_slot(raw: &str) -> Result<Slot, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut resolved =
        Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(id) = &cli.id {
        resolved.config.stash.id = Some(id.clone());
    }
    if let Some(slot) = cli.backend {
        resolved.config.stash.force_backend = Some(slot.to_string());
    }

    let mut log_config = bridge::to_log_config(&resolved.config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = keystash_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let mut out = std::io::stdout().lock();

    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Show { format } => {
                config::show_config(&resolved, (*format).into(), &mut out)
            },
            ConfigCommands::Path => config::show_path(&mut out),
        };
    }

    let store = bridge::build_stash(&resolved.config)?;
    let mut options = bridge::default_options(&resolved.config)?;
    let context = cli.cookie.as_deref().map(RequestContext::from_cookie_header);
    if let Some(ctx) = &context {
        options = options.with_context(ctx.clone());
    }

    match cli.command {
        Commands::Get { key, kind, default } => {
            if let Some(raw) = default {
                options = options.with_default(stash::parse_value(&raw, ValueKind::Json)?);
            }
            stash::get(&store, &key, kind, &options, &mut out).await?;
        },
        Commands::Set {
            key,
            value,
            kind,
            max_age,
        } => {
            if let Some(seconds) = max_age {
                options = options.with_max_age(seconds);
            }
            stash::set(&store, &key, &value, kind, &options).await?;
        },
        Commands::Delete { key } => stash::delete(&store, &key, &options).await?,
        Commands::Clear => stash::clear(&store, &options).await?,
        Commands::Config { .. } => {},
    }

    if let Some(ctx) = context {
        for header in ctx.set_cookie_headers() {
            writeln!(out, "Set-Cookie: {header}")?;
        }
    }

    Ok(())
}
