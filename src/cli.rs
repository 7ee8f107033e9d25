//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quill static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Override base URL for the site.
    ///
    /// Used by `ctx.absolutify()` and `ctx.tag_uri()`. Takes precedence over
    /// `[build] base_url` in `.quill.toml`.
    ///
    /// Example:
    ///   quill --base-url "https://example.com/blog" build site public
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Print every rendered and written file
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site once
    Build {
        /// Input directory
        input: PathBuf,

        /// Output directory
        output: PathBuf,
    },

    /// Build, serve, and rebuild on change
    Watch {
        /// Input directory
        input: PathBuf,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind on
        #[arg(long)]
        host: Option<String>,

        /// Output directory (default: a temporary directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn input(&self) -> &PathBuf {
        match &self.command {
            Commands::Build { input, .. } | Commands::Watch { input, .. } => input,
        }
    }
}
