//! Markdown to HTML.
//!
//! Content files may pull other files in with directives:
//!
//! ```text
//! ::include{path=.snippets/intro.md}            ← on its own line: block
//! 2 + 2 = :include{path=.add.jinja a=2 b=2}     ← inside text: inline
//! ```
//!
//! The included file is rendered through its own processor, so a markdown
//! include yields HTML and a jinja include yields whatever it prints. Every
//! attribute except `path` becomes a variable of the included render.
//! Directives inside code blocks and code spans are left alone.
//!
//! Code blocks are not highlighted; they carry a `language-*` class for
//! client-side highlighters.

use std::sync::{Arc, LazyLock};

use minijinja::Value;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream, html};
use regex::Regex;

use crate::{
    context::FileContext,
    error::{Error, Result},
};

use super::processors::IncludeArgs;

static RE_LEAF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^::include\{([^}]*)\}$").unwrap());
static RE_INLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":include\{([^}]*)\}").unwrap());
static RE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)=(?:"([^"]*)"|([^\s"]+))"#).unwrap());

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Render plain markdown, no directive support.
pub fn render(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(text, options()));
    out
}

/// Render markdown, resolving `include` directives through `ctx`.
pub fn render_with_directives(text: &str, ctx: &Arc<FileContext>) -> Result<String> {
    let events: Vec<Event<'_>> = TextMergeStream::new(Parser::new_ext(text, options())).collect();
    let mut out_events = Vec::with_capacity(events.len());
    let mut in_code_block = false;

    let mut i = 0;
    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            // A paragraph holding nothing but a leaf directive becomes a block
            Event::Start(Tag::Paragraph) => {
                if let (Some(Event::Text(inner)), Some(Event::End(TagEnd::Paragraph))) =
                    (events.get(i + 1), events.get(i + 2))
                    && let Some(caps) = RE_LEAF.captures(inner.trim())
                {
                    let rendered = include(ctx, inner, &caps[1])?;
                    out_events.push(Event::Html(ensure_newline(rendered).into()));
                    i += 3;
                    continue;
                }
            }
            Event::Text(inner) if !in_code_block && RE_INLINE.is_match(inner) => {
                expand_inline(ctx, inner, &mut out_events)?;
                i += 1;
                continue;
            }
            _ => {}
        }
        out_events.push(events[i].clone());
        i += 1;
    }

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, out_events.into_iter());
    Ok(out)
}

/// Split a text run around inline directives.
fn expand_inline<'a>(
    ctx: &Arc<FileContext>,
    text: &CowStr<'a>,
    out: &mut Vec<Event<'a>>,
) -> Result<()> {
    let mut last = 0;
    for caps in RE_INLINE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        // `::include` is a leaf directive that did not stand alone; keep it
        if text[..m.start()].ends_with(':') {
            continue;
        }
        if m.start() > last {
            out.push(Event::Text(text[last..m.start()].to_owned().into()));
        }
        let rendered = include(ctx, m.as_str(), &caps[1])?;
        out.push(Event::InlineHtml(rendered.into()));
        last = m.end();
    }
    if last < text.len() {
        out.push(Event::Text(text[last..].to_owned().into()));
    }
    Ok(())
}

fn include(ctx: &Arc<FileContext>, directive: &str, attrs: &str) -> Result<String> {
    let (path, args) = parse_attributes(directive, attrs)?;
    ctx.include(&path, &args)
}

/// Parse `key=value key="quoted value"` into the path and the remaining args.
fn parse_attributes(directive: &str, attrs: &str) -> Result<(String, IncludeArgs)> {
    let mut path = None;
    let mut args = IncludeArgs::new();

    for caps in RE_ATTR.captures_iter(attrs) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        match &caps[1] {
            "path" => path = Some(value.to_owned()),
            key => {
                args.insert(key.to_owned(), Value::from(value));
            }
        }
    }

    let path = path.ok_or_else(|| Error::Directive {
        directive: directive.trim().to_owned(),
        message: "missing required attribute `path`".into(),
    })?;
    Ok((path, args))
}

fn ensure_newline(mut html: String) -> String {
    if !html.ends_with('\n') {
        html.push('\n');
    }
    html
}
