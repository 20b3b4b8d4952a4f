//! Fillo CLI - Main entry point

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fillo - LLM-generated content for form fields, with a local cache
#[derive(Parser, Debug)]
#[command(name = "fillo")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Directory holding settings.json and credentials.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Cache database file
    #[arg(long, global = true)]
    cache_db: Option<PathBuf>,
}

/// Field descriptor shared by generate and suggest
#[derive(clap::Args, Debug, Clone)]
struct FieldArgs {
    /// Field type (email, name, bio, ...)
    #[arg(long = "type")]
    field_type: String,

    /// Field label as shown on the form
    #[arg(long)]
    label: String,

    /// What the form is about
    #[arg(long, default_value = "")]
    context: String,

    /// Use this cache signature instead of deriving one
    #[arg(long)]
    signature: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate content for one field
    Generate {
        #[command(flatten)]
        field: FieldArgs,

        /// Extra instructions passed to the model
        #[arg(long)]
        note: Option<String>,

        /// Skip the cache entirely
        #[arg(long)]
        no_cache: bool,

        /// Ignore cached values but store the new one
        #[arg(short, long)]
        force: bool,

        /// Pick randomly among cached candidates
        #[arg(long)]
        random: bool,

        /// Creativity level (0.1 - 2.0)
        #[arg(long)]
        creativity: Option<f64>,

        /// Produce N fresh variants instead of one value
        #[arg(long)]
        multiple: Option<usize>,
    },
    /// Show cached values for a field without calling a provider
    Suggest {
        #[command(flatten)]
        field: FieldArgs,

        #[arg(short, long, default_value = "3")]
        limit: usize,
    },
    /// Cache statistics
    Stats,
    /// Delete every cached value
    Clear,
    /// Remove expired entries and trim to capacity
    Cleanup,
    /// Check a provider's credential and endpoint
    TestConnection { provider: String },
    /// List providers and whether they are configured
    Providers,
    /// List models offered by a provider
    Models { provider: String },
    /// Store an API key
    SetKey {
        provider: String,
        key: String,

        /// Store even if the key looks malformed
        #[arg(long)]
        force: bool,
    },
    /// Delete a stored API key
    RemoveKey { provider: String },
    /// Switch the active provider
    Use { provider: String },
    /// Print the effective settings
    Settings,
    /// List creativity presets
    Presets,
    /// Run periodic cleanup until Ctrl-C
    Maintain {
        #[arg(long, default_value = "3600")]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr; stdout carries JSON)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match commands::run(args).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            println!("{}", serde_json::to_string_pretty(&commands::failure(&e))?);
            std::process::exit(1);
        }
    }
}
