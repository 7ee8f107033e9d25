//! Quill - a file-focused static site generator.

mod build;
mod catalog;
mod cli;
mod compiler;
mod config;
mod context;
mod error;
mod logger;
mod scheduler;
mod serve;
mod utils;
mod watch;

use anyhow::{Context, Result, bail};
use build::{BuildOptions, BuildScope, build_site};
use clap::Parser;
use cli::{Cli, Commands};
use config::QuillConfig;
use serve::DevServer;
use std::{fs, path::Path};
use utils::path::normalize_path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);

    let config = QuillConfig::from_cli(&cli)
        .with_context(|| format!("Failed to load configuration from {}", cli.input().display()))?;

    match &cli.command {
        Commands::Build { input, output } => build_once(input, output, config),
        Commands::Watch { input, output, .. } => watch(input, output.as_deref(), config),
    }
}

fn ensure_input(input: &Path) -> Result<()> {
    if !input.is_dir() {
        bail!("Input directory not found: {}", input.display());
    }
    Ok(())
}

fn build_once(input: &Path, output: &Path, config: QuillConfig) -> Result<()> {
    ensure_input(input)?;
    let options = BuildOptions {
        input: normalize_path(input),
        output: normalize_path(output),
        base_url: config.build.base_url,
    };

    let report = build_site(&options, &BuildScope::Full)?;
    report.log_summary();
    if !report.is_success() {
        bail!("{} file(s) failed to render", report.failures.len());
    }
    log!("build"; "done");
    Ok(())
}

fn watch(input: &Path, output: Option<&Path>, config: QuillConfig) -> Result<()> {
    ensure_input(input)?;

    // Dropped on return, which removes the directory after Ctrl+C
    let temp_output;
    let output = match output {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            normalize_path(dir)
        }
        None => {
            temp_output = tempfile::Builder::new()
                .prefix("quill-site-")
                .tempdir()
                .context("Failed to create temporary output directory")?;
            normalize_path(temp_output.path())
        }
    };

    let server = DevServer::bind(&config.serve.host, config.serve.port)?;
    server.stop_on_ctrlc()?;

    let options = BuildOptions {
        input: normalize_path(input),
        output: output.clone(),
        base_url: config.build.base_url.or_else(|| Some(server.url.clone())),
    };
    let _watcher = watch::start(options)?;

    server.run(&output);
    Ok(())
}
