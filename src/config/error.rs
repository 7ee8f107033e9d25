//! Errors from loading `.quill.toml` and applying CLI overrides.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid .quill.toml")]
    Toml(#[from] toml::de::Error),

    /// `base_url` has to be absolute: `absolutify` and `tag_uri` build on it.
    #[error("base_url must start with http:// or https://, got `{0}`")]
    InvalidBaseUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_config_error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("site/.quill.toml"),
            Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(io_err.to_string(), "cannot read config file `site/.quill.toml`");

        let url_err = ConfigError::InvalidBaseUrl("example.com".into());
        assert_eq!(
            url_err.to_string(),
            "base_url must start with http:// or https://, got `example.com`"
        );
    }
}
