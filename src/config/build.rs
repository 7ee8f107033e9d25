//! `[build]` section configuration.

use super::{ConfigError, defaults};
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[build]` section in .quill.toml.
///
/// # Example
/// ```toml
/// [build]
/// base_url = "https://example.com/blog"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Absolute site URL used by `ctx.absolutify()` and `ctx.tag_uri()`.
    #[serde(default = "defaults::build::base_url")]
    #[educe(Default = defaults::build::base_url())]
    pub base_url: Option<String>,
}

impl BuildConfig {
    /// Check `base_url` and drop its trailing slash.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        let Some(url) = self.base_url.as_mut() else {
            return Ok(());
        };
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(url.clone()));
        }
        let trimmed = url.trim_end_matches('/').len();
        url.truncate(trimmed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(url: &str) -> BuildConfig {
        BuildConfig {
            base_url: Some(url.to_owned()),
        }
    }

    #[test]
    fn test_normalize_trims_trailing_slash() {
        let mut config = build("https://example.com/blog/");
        config.normalize().unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://example.com/blog"));
    }

    #[test]
    fn test_normalize_rejects_relative() {
        assert!(matches!(
            build("example.com").normalize(),
            Err(ConfigError::InvalidBaseUrl(url)) if url == "example.com"
        ));
    }

    #[test]
    fn test_normalize_without_url() {
        let mut config = BuildConfig::default();
        config.normalize().unwrap();
        assert_eq!(config.base_url, None);
    }
}
