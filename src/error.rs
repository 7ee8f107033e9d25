//! Errors raised while rendering a single input file.
//!
//! Every variant aborts only the render of the file that raised it; the build
//! orchestrator logs it and moves on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by the template engine or a processor.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no file matches `{pattern}`")]
    NotFound { pattern: String },

    #[error("`{pattern}` matches {} files, expected exactly one: {}", .matches.len(), .matches.join(", "))]
    AmbiguousMatch {
        pattern: String,
        matches: Vec<String>,
    },

    #[error("cannot include `{path}`: {reason}")]
    InvalidTarget { path: String, reason: &'static str },

    #[error("invalid glob pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("no template named `{name}` under .templates")]
    TemplateNotFound { name: String },

    #[error("files without an explicit template require a default template at .templates/{name}.jinja")]
    MissingDefaultTemplate { name: String },

    #[error("cannot paginate in template `{path}`, call paginate from the content file instead")]
    InTemplateNotAllowed { path: String },

    #[error("cannot absolutify without a base url, see the --base-url option")]
    MissingBaseUrl,

    #[error("invalid page {page}; the current page must be between 1-{count}")]
    OutOfRange { page: usize, count: usize },

    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("invalid front matter in `{path}`: {message}")]
    FrontMatter { path: String, message: String },

    #[error("invalid directive `{directive}`: {message}")]
    Directive { directive: String, message: String },

    #[error("invalid date `{value}`")]
    InvalidDate { value: String },

    #[error("include depth exceeded while including `{path}`, is there an include cycle?")]
    IncludeDepth { path: String },

    #[error("the build owning `{path}` has already finished")]
    ContextReleased { path: String },

    #[error("IO error when reading `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in `{path}`")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to render `{path}`")]
    Processor {
        path: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Wrap any processor or template-engine failure for `path`.
    pub fn processor(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Processor {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl From<Error> for minijinja::Error {
    fn from(err: Error) -> Self {
        minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, err.to_string())
            .with_source(err)
    }
}
