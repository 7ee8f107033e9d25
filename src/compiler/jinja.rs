//! Jinja environments bound to a file context.
//!
//! Every environment resolves `{% include %}` / `{% extends %}` /
//! `{% import %}` names relative to the including file (a leading `/` means
//! the input root) and loads them through [`FileContext::include_source`],
//! which records the dependency edge. Output is never auto-escaped.

use std::{borrow::Cow, collections::BTreeMap, sync::Arc};

use minijinja::{AutoEscape, Environment, Value};

use crate::{
    catalog::InputFile,
    context::FileContext,
    error::{Error, Result},
    utils::path::{join_rel, parent_dir},
};

use super::processors::IncludeArgs;

/// Fresh environment whose loader reads through `ctx`.
pub fn environment(ctx: &Arc<FileContext>) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_path_join_callback(join_template_path);

    let loader = Arc::clone(ctx);
    env.set_loader(move |name| loader.include_source(name).map_err(Into::into));
    env
}

/// Resolve `name` against the directory of `parent`.
fn join_template_path<'s>(name: &'s str, parent: &'s str) -> Cow<'s, str> {
    match join_rel(parent_dir(parent), name) {
        Some(joined) => Cow::Owned(joined),
        None => Cow::Borrowed(name),
    }
}

/// Compile `source` under its relative path in a new environment.
pub fn compile(ctx: &Arc<FileContext>, rel: &str, source: &str) -> Result<Environment<'static>> {
    let mut env = environment(ctx);
    env.add_template_owned(rel.to_owned(), source.to_owned())
        .map_err(|e| Error::processor(rel, e))?;
    Ok(env)
}

/// Render a compiled template with `vars`.
pub fn render(env: &Environment<'_>, rel: &str, vars: &BTreeMap<String, Value>) -> Result<String> {
    env.get_template(rel)
        .and_then(|template| template.render(vars))
        .map_err(|e| Error::processor(rel, e))
}

/// Render a `.jinja` source file with `ctx`, `file` and include arguments.
pub fn render_file(file: &InputFile, ctx: &Arc<FileContext>, args: &IncludeArgs) -> Result<String> {
    let rel = &file.relative_path;
    let env = compile(ctx, rel, file.body.as_deref().unwrap_or_default())?;

    let mut vars = args.clone();
    vars.insert("ctx".into(), ctx.to_value());
    vars.insert("file".into(), Value::from_serialize(file.view()));
    render(&env, rel, &vars)
}
