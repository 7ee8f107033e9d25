//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    pub fn base_url() -> Option<String> {
        None
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn host() -> String {
        "localhost".into()
    }

    pub fn port() -> u16 {
        8000
    }
}
