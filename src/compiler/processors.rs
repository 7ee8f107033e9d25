//! Processor registry.
//!
//! A processor claims input files by extension, maps them to an output path
//! and renders their content. The registry is a fixed ordered list; the first
//! processor that matches wins and unmatched text files pass through as-is.

use std::{collections::BTreeMap, fmt, sync::Arc};

use minijinja::Value;
use serde_json::json;

use crate::{
    catalog::{Attributes, InputFile, TEMPLATE_KEY},
    context::FileContext,
    error::Result,
};

use super::{jinja, markdown};

/// Extra variables passed by `include(path, key=value, ...)`.
pub type IncludeArgs = BTreeMap<String, Value>;

pub trait Processor: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, file: &InputFile) -> bool;

    /// Output path relative to the output root.
    fn output_path(&self, file: &InputFile) -> String;

    /// Attributes merged underneath the file's own front matter.
    fn default_attributes(&self) -> Attributes {
        Attributes::new()
    }

    fn process(&self, file: &InputFile, ctx: &Arc<FileContext>, args: &IncludeArgs)
    -> Result<String>;
}

pub static PROCESSORS: &[&dyn Processor] = &[&MarkdownProcessor, &JinjaProcessor];

/// First processor claiming `file`.
pub fn lookup(file: &InputFile) -> Option<&'static dyn Processor> {
    PROCESSORS.iter().copied().find(|p| p.matches(file))
}

fn join(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_owned()
    } else {
        format!("{dir}/{file}")
    }
}

// ============================================================================
// Markdown
// ============================================================================

/// `.md` → `.html`, wrapped in the `default` template unless told otherwise.
#[derive(Debug)]
pub struct MarkdownProcessor;

impl Processor for MarkdownProcessor {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn matches(&self, file: &InputFile) -> bool {
        file.ext.eq_ignore_ascii_case(".md")
    }

    fn output_path(&self, file: &InputFile) -> String {
        join(&file.dir, &format!("{}.html", file.name))
    }

    fn default_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(TEMPLATE_KEY.to_owned(), json!("default"));
        attrs
    }

    fn process(
        &self,
        file: &InputFile,
        ctx: &Arc<FileContext>,
        _args: &IncludeArgs,
    ) -> Result<String> {
        markdown::render_with_directives(file.body.as_deref().unwrap_or_default(), ctx)
    }
}

// ============================================================================
// Jinja
// ============================================================================

/// `*.jinja` rendered as a Jinja template; the `.jinja` suffix is dropped.
#[derive(Debug)]
pub struct JinjaProcessor;

impl Processor for JinjaProcessor {
    fn name(&self) -> &'static str {
        "jinja"
    }

    fn matches(&self, file: &InputFile) -> bool {
        file.ext == ".jinja"
    }

    fn output_path(&self, file: &InputFile) -> String {
        join(&file.dir, &file.name)
    }

    fn process(&self, file: &InputFile, ctx: &Arc<FileContext>, args: &IncludeArgs) -> Result<String> {
        jinja::render_file(file, ctx, args)
    }
}
