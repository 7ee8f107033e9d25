//! `[serve]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[serve]` section in .quill.toml - development server settings.
///
/// # Example
/// ```toml
/// [serve]
/// host = "0.0.0.0"  # Listen on all interfaces
/// port = 3000
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// Host name or address to bind.
    #[serde(default = "defaults::serve::host")]
    #[educe(Default = defaults::serve::host())]
    pub host: String,

    /// HTTP port number (default: 8000). The next free port is used when busy.
    #[serde(default = "defaults::serve::port")]
    #[educe(Default = defaults::serve::port())]
    pub port: u16,
}
