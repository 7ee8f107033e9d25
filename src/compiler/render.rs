//! Rendering one input file into its outputs.
//!
//! ```text
//! body ──► processor? ──► template? ──► Output
//!                                          │
//!             ctx.paginate() was called? ──┴──► re-render once per page
//! ```

use std::sync::Arc;

use crate::{
    catalog::InputFile,
    context::GlobalContext,
    error::{Error, Result},
    utils::url::public_url,
};

use super::{
    processors::IncludeArgs,
    templates::{OutputView, TEMPLATES_DIR, TemplateTable},
};

/// One file to write, relative to the output root.
#[derive(Debug)]
pub struct Output {
    pub path: String,
    pub content: String,
    pub source: Arc<InputFile>,
}

pub struct Renderer<'a> {
    global: &'a GlobalContext,
    templates: &'a TemplateTable,
}

impl<'a> Renderer<'a> {
    pub fn new(global: &'a GlobalContext, templates: &'a TemplateTable) -> Self {
        Self { global, templates }
    }

    /// Primary output of `file`, followed by one output per page.
    pub fn render(&self, file: &Arc<InputFile>) -> Result<Vec<Output>> {
        let rel = &file.relative_path;
        self.global.mark_touched(rel);

        if let Some(message) = &file.front_matter_error {
            return Err(Error::FrontMatter {
                path: rel.clone(),
                message: message.clone(),
            });
        }

        let mut outputs = vec![self.render_once(file)?];

        if let Some(pages) = self.global.pages(rel) {
            for page in pages {
                self.global.set_current_page(rel, page.number)?;
                let mut output = self.render_once(file)?;
                output.path = page.output_path;
                outputs.push(output);
            }
        }

        Ok(outputs)
    }

    fn render_once(&self, file: &Arc<InputFile>) -> Result<Output> {
        let rel = &file.relative_path;
        let ctx = self.global.file_context(file);

        let mut output = Output {
            path: rel.clone(),
            content: file.body.clone().unwrap_or_default(),
            source: Arc::clone(file),
        };

        if let Some(processor) = file.processor {
            output.path = processor.output_path(file);
            output.content = processor.process(file, &ctx, &IncludeArgs::new())?;
        }

        let Some(template) = file.template() else {
            return Ok(output);
        };
        let name = template
            .as_str()
            .ok_or_else(|| Error::processor(rel, format!("`template` must be a string, got {template}")))?;

        let Some(template) = self.templates.get(name) else {
            // Depend on the missing file so creating it triggers a rebuild
            self.global
                .add_dependency(rel, &format!("{TEMPLATES_DIR}/{name}.jinja"));
            return Err(if file.template_from_default {
                Error::MissingDefaultTemplate { name: name.into() }
            } else {
                Error::TemplateNotFound { name: name.into() }
            });
        };

        self.global.add_dependency(rel, &template.file.relative_path);
        let view = OutputView {
            path: &output.path,
            content: &output.content,
            attributes: &file.attributes,
            url: public_url(&output.path),
        };
        output.content = template.apply(&view, file)?;
        Ok(output)
    }
}
