//! Site configuration from `.quill.toml`.
//!
//! The file is optional and lives at the top of the input directory. Being a
//! dot file, it is never rendered itself.
//!
//! | Section   | Purpose                           |
//! |-----------|-----------------------------------|
//! | `[build]` | Base URL for absolute links       |
//! | `[serve]` | Development server (host, port)   |
//!
//! ```toml
//! [build]
//! base_url = "https://example.com"
//!
//! [serve]
//! port = 8000
//! ```
//!
//! Command-line flags override values from the file.

mod build;
pub mod defaults;
mod error;
mod serve;

pub use build::BuildConfig;
pub use error::ConfigError;
pub use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{fs, io::ErrorKind, path::Path};

pub const CONFIG_FILE: &str = ".quill.toml";

/// Root configuration structure representing .quill.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct QuillConfig {
    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl QuillConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `.quill.toml` from `root`, or defaults when there is none.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Self::from_str(&content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(path, err)),
        }
    }

    /// Load for `cli.input()`, apply flag overrides and validate.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = Self::load(cli.input())?;
        config.update_with_cli(cli);
        config.build.normalize()?;
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.base_url {
            self.build.base_url = Some(url.clone());
        }

        if let Commands::Watch { port, host, .. } = &cli.command {
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.host, host.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }
}
