//! CLI argument definitions for Artipush.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use artipush_core::config::StoreBackend;

#[derive(Parser, Debug)]
#[command(
    name = "artipush",
    version,
    about = "Publish build artifacts to object storage",
    long_about = "Artipush uploads a build artifact to a Google Cloud Storage bucket \
                  (or a local directory tree) and reports a stable URL for it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload the configured artifact and print the resulting record
    Push {
        #[command(flatten)]
        target: TargetArgs,
        /// Directory the source path is resolved against [default: config directory]
        #[arg(long)]
        source_dir: Option<PathBuf>,
        /// Abort the push after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Write the artifact JSON to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the configuration without uploading anything
    Validate {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show documentation for the registry settings
    Docs {
        /// Print the documentation record as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Configuration sources shared by `push` and `validate`.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Path to the config file [default: Artipush.toml in this or a parent directory]
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Build artifact to upload, relative to the source directory
    #[arg(long)]
    pub source: Option<String>,
    /// Object name to create in the bucket
    #[arg(long)]
    pub name: Option<String>,
    /// Destination bucket
    #[arg(long, env = "ARTIPUSH_BUCKET")]
    pub bucket: Option<String>,
    /// Object store backend: gcs, local
    #[arg(long)]
    pub backend: Option<StoreBackend>,
    /// Root directory of the local backend
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Storage API endpoint, e.g. an emulator
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Per-request HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub request_timeout: Option<u64>,
}

/// Parse command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}
