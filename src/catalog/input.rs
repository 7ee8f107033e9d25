//! Typed record for one discovered input file.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::Value;

use super::front_matter::{self, Attributes};
use crate::{
    compiler::{processors::{self, Processor}, templates::TEMPLATES_DIR},
    error::{Error, Result},
    utils::{path as rel, url},
};

/// Extensions that are always copied verbatim.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "avif", "ico", "bmp", "tiff", "psd", "pdf", "zip",
    "gz", "tgz", "bz2", "xz", "7z", "rar", "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4",
    "m4a", "ogg", "oga", "wav", "flac", "webm", "mov", "avi", "mkv", "wasm", "exe", "dll", "so",
    "dylib", "bin",
];

/// Bytes inspected for NUL when sniffing text.
const SNIFF_LEN: usize = 8000;

/// Attribute selecting the template of a text file.
pub const TEMPLATE_KEY: &str = "template";

/// One file under the input root.
///
/// Built once per build; never mutated afterwards.
pub struct InputFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the input root, `/`-separated.
    pub relative_path: String,
    /// Directory part of `relative_path` (empty at the root).
    pub dir: String,
    /// Base name without extension.
    pub name: String,
    /// Extension including the dot, or empty.
    pub ext: String,
    pub is_text: bool,
    /// Body with front matter stripped. `None` for binary files.
    pub body: Option<String>,
    /// Own attributes merged over the processor defaults.
    pub attributes: Attributes,
    /// True when `template` came from processor defaults, not the file.
    pub template_from_default: bool,
    /// Front matter that failed to parse. Rendering this file fails.
    pub front_matter_error: Option<String>,
    pub processor: Option<&'static dyn Processor>,
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("relative_path", &self.relative_path)
            .field("is_text", &self.is_text)
            .field("processor", &self.processor.map(|p| p.name()))
            .finish_non_exhaustive()
    }
}

/// Serializable snapshot of a file handed to templates.
#[derive(Debug, Serialize)]
pub struct FileView<'a> {
    pub path: &'a str,
    pub url: String,
    pub output_path: String,
    pub attributes: &'a Attributes,
    pub body: Option<&'a str>,
}

impl InputFile {
    /// Read `path` (absolute, under `root`) and classify it.
    pub fn load(root: &Path, path: PathBuf) -> Result<Self> {
        let bytes = fs::read(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let relative_path = rel::to_rel_key(relative);
        Ok(Self::from_bytes(path, relative_path, bytes))
    }

    /// Classify already-read content.
    pub fn from_bytes(path: PathBuf, relative_path: String, bytes: Vec<u8>) -> Self {
        let dir = rel::parent_dir(&relative_path).to_owned();
        let base = relative_path.rsplit('/').next().unwrap_or(&relative_path);
        let (name, ext) = rel::split_name(base);
        let (name, ext) = (name.to_owned(), ext.to_owned());

        let text = sniff_text(&ext, bytes);
        let mut file = Self {
            path,
            relative_path,
            dir,
            name,
            ext,
            is_text: text.is_some(),
            body: None,
            attributes: Attributes::new(),
            template_from_default: false,
            front_matter_error: None,
            processor: None,
        };

        let Some(text) = text else {
            return file;
        };

        let own = match front_matter::parse(&text) {
            Ok(parsed) => {
                file.body = Some(parsed.body.to_owned());
                parsed.attributes
            }
            Err(message) => {
                file.front_matter_error = Some(message);
                file.body = Some(text.clone());
                Attributes::new()
            }
        };

        file.processor = processors::lookup(&file);
        if let Some(processor) = file.processor {
            let mut merged = processor.default_attributes();
            file.template_from_default =
                merged.contains_key(TEMPLATE_KEY) && !own.contains_key(TEMPLATE_KEY);
            merged.extend(own);
            file.attributes = merged;
        } else {
            file.attributes = own;
        }

        file
    }

    /// Output path relative to the output root.
    pub fn output_path(&self) -> String {
        self.processor
            .map_or_else(|| self.relative_path.clone(), |p| p.output_path(self))
    }

    /// Public URL of the primary output.
    pub fn url(&self) -> String {
        url::public_url(&self.output_path())
    }

    /// File lies under the templates directory.
    pub fn is_template(&self) -> bool {
        self.relative_path
            .strip_prefix(TEMPLATES_DIR)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Any path segment starts with `.`; such files are never rendered alone.
    pub fn is_within_dot_directory(&self) -> bool {
        rel::is_within_dot_directory(&self.relative_path)
    }

    /// Selected template, ignoring an explicit `null`.
    pub fn template(&self) -> Option<&Value> {
        self.attributes.get(TEMPLATE_KEY).filter(|v| !v.is_null())
    }

    /// String attribute lookup.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn view(&self) -> FileView<'_> {
        FileView {
            path: &self.relative_path,
            url: self.url(),
            output_path: self.output_path(),
            attributes: &self.attributes,
            body: self.body.as_deref(),
        }
    }
}

/// Decode `bytes` as text unless they look binary.
fn sniff_text(ext: &str, bytes: Vec<u8>) -> Option<String> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    if BINARY_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    if bytes[..bytes.len().min(SNIFF_LEN)].contains(&0) {
        return None;
    }
    String::from_utf8(bytes).ok()
}
