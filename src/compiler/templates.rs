//! Named templates under `.templates/`.
//!
//! `.templates/default.jinja` is the template `default`,
//! `.templates/blog/post.jinja` is `blog/post`. Each template is compiled once
//! per build against its own file context, so `ctx.list` or `ctx.include`
//! inside a template record edges on the template's file; the content file
//! using it depends on the template file in turn.

use std::{collections::BTreeMap, sync::Arc};

use minijinja::{Environment, Value};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    catalog::{Attributes, InputFile},
    context::{FileContext, GlobalContext},
    error::{Error, Result},
};

use super::jinja;

pub const TEMPLATES_DIR: &str = ".templates";
const TEMPLATE_EXT: &str = ".jinja";

/// Rendered content handed to a template as `output`.
#[derive(Debug, Serialize)]
pub struct OutputView<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub attributes: &'a Attributes,
    pub url: String,
}

pub struct Template {
    pub name: String,
    pub file: Arc<InputFile>,
    ctx: Arc<FileContext>,
    /// Compile errors surface when the template is applied.
    compiled: std::result::Result<Environment<'static>, String>,
}

impl Template {
    fn compile(global: &GlobalContext, file: &Arc<InputFile>, name: String) -> Self {
        let ctx = global.file_context(file);
        let source = file.body.as_deref().unwrap_or_default();
        let compiled = jinja::compile(&ctx, &file.relative_path, source).map_err(|e| {
            let mut message = e.to_string();
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                message = format!("{message}: {cause}");
                source = cause.source();
            }
            message
        });
        Self {
            name,
            file: Arc::clone(file),
            ctx,
            compiled,
        }
    }

    /// Render `output` for the content file `using`.
    pub fn apply(&self, output: &OutputView<'_>, using: &InputFile) -> Result<String> {
        let rel = &self.file.relative_path;
        let env = self
            .compiled
            .as_ref()
            .map_err(|message| Error::processor(rel, message.clone()))?;

        let vars = BTreeMap::from([
            ("output".to_owned(), Value::from_serialize(output)),
            ("ctx".to_owned(), self.ctx.to_value()),
            ("file".to_owned(), Value::from_serialize(using.view())),
        ]);
        jinja::render(env, rel, &vars)
    }
}

/// All templates of one build.
#[derive(Default)]
pub struct TemplateTable {
    templates: FxHashMap<String, Template>,
}

impl TemplateTable {
    /// Compile every `.jinja` file under `.templates/`.
    pub fn build(global: &GlobalContext) -> Self {
        let templates = global
            .catalog()
            .files()
            .filter(|file| file.is_text && file.is_template())
            .filter_map(|file| {
                let name = template_name(&file.relative_path)?;
                Some((name.clone(), Template::compile(global, file, name)))
            })
            .collect();
        Self { templates }
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }
}

/// `.templates/blog/post.jinja` → `blog/post`.
pub fn template_name(rel: &str) -> Option<String> {
    rel.strip_prefix(TEMPLATES_DIR)?
        .strip_prefix('/')?
        .strip_suffix(TEMPLATE_EXT)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}
