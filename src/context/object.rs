//! `ctx` as seen from Jinja.
//!
//! ```jinja
//! {% for post in ctx.list("posts/*.md", sort="date", order="desc", type="date") %}
//!   <a href="{{ post.url }}">{{ post.attributes.title }}</a>
//! {% endfor %}
//! {{ ctx.include(".parts/card.jinja", title="Hi") }}
//! {% set page = ctx.paginate(posts, page_size=10) %}
//! ```

use std::sync::Arc;

use minijinja::{
    Error, ErrorKind, State,
    value::{Kwargs, Object, Value, from_args},
};

use super::{FileContext, SortKind, SortOrder, SortSpec};
use crate::compiler::{pagination::DEFAULT_PAGE_SIZE, processors::IncludeArgs};

#[derive(Debug)]
struct ContextObject(Arc<FileContext>);

impl FileContext {
    /// Wrap this context for a template.
    pub fn to_value(self: &Arc<Self>) -> Value {
        Value::from_object(ContextObject(Arc::clone(self)))
    }
}

fn invalid(message: String) -> Error {
    Error::new(ErrorKind::InvalidOperation, message)
}

fn sort_spec(kwargs: &Kwargs) -> Result<Option<SortSpec>, Error> {
    let Some(attribute) = kwargs.get::<Option<String>>("sort")? else {
        return Ok(None);
    };
    let order = match kwargs.get::<Option<String>>("order")?.as_deref() {
        None | Some("asc") => SortOrder::Asc,
        Some("desc") => SortOrder::Desc,
        Some(other) => return Err(invalid(format!("unknown sort order `{other}`"))),
    };
    let kind = match kwargs.get::<Option<String>>("type")?.as_deref() {
        None | Some("string") => SortKind::String,
        Some("date") => SortKind::Date,
        Some(other) => return Err(invalid(format!("unknown sort type `{other}`"))),
    };
    Ok(Some(SortSpec {
        attribute,
        order,
        kind,
    }))
}

impl Object for ContextObject {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "file" => Some(Value::from_serialize(self.0.file().view())),
            "url" => Some(Value::from(self.0.current_url())),
            _ => None,
        }
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        let ctx = &self.0;
        match method {
            "list" => {
                let (pattern, kwargs): (String, Kwargs) = from_args(args)?;
                let sort = sort_spec(&kwargs)?;
                kwargs.assert_all_used()?;
                let files = ctx.list(&pattern, sort.as_ref())?;
                let views: Vec<_> = files.iter().map(|f| f.view()).collect();
                Ok(Value::from_serialize(&views))
            }
            "include" => {
                let (pattern, kwargs): (String, Kwargs) = from_args(args)?;
                let mut include_args = IncludeArgs::new();
                for key in kwargs.args() {
                    include_args.insert(key.to_owned(), kwargs.get::<Value>(key)?);
                }
                Ok(Value::from(ctx.include(&pattern, &include_args)?))
            }
            "paginate" => {
                let (items, kwargs): (Value, Kwargs) = from_args(args)?;
                let page_size = kwargs
                    .get::<Option<usize>>("page_size")?
                    .unwrap_or(DEFAULT_PAGE_SIZE);
                kwargs.assert_all_used()?;
                let items: Vec<Value> = items.try_iter()?.collect();
                Ok(ctx.paginate(items, page_size)?)
            }
            "absolutify" => {
                let (url,): (String,) = from_args(args)?;
                Ok(Value::from(ctx.absolutify(&url)?))
            }
            "read_json" => {
                let (path,): (String,) = from_args(args)?;
                Ok(Value::from_serialize(ctx.read_json(&path)?))
            }
            "render_markdown" => {
                let (text,): (String,) = from_args(args)?;
                Ok(Value::from(ctx.render_markdown(&text)))
            }
            "format_date" => {
                let (date, format): (String, String) = from_args(args)?;
                Ok(Value::from(ctx.format_date(&date, &format)?))
            }
            "now" => {
                let () = from_args(args)?;
                Ok(Value::from(ctx.now()))
            }
            "current_url" => {
                let () = from_args(args)?;
                Ok(Value::from(ctx.current_url()))
            }
            "tag_uri" => {
                let (date,): (Option<String>,) = from_args(args)?;
                Ok(Value::from(ctx.tag_uri(date.as_deref())?))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("ctx has no method named {method}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        compiler::{jinja, processors::IncludeArgs},
        context::GlobalContext,
        error::Result,
        utils::testing,
    };
    use pretty_assertions::assert_eq;

    fn render(files: &[(&str, &str)], rel: &str, base_url: Option<&str>) -> Result<String> {
        let dir = testing::site(files);
        let global = GlobalContext::scan(dir.path(), None, base_url).unwrap();
        let file = global.catalog().get(rel).cloned().unwrap();
        let ctx = global.file_context(&file);
        jinja::render_file(&file, &ctx, &IncludeArgs::new())
    }

    #[test]
    fn test_list_from_template() {
        let out = render(
            &[
                (
                    "index.html.jinja",
                    "{% for p in ctx.list('posts/*.md', sort='title', order='desc') %}{{ p.attributes.title }} {{ p.url }};{% endfor %}",
                ),
                ("posts/a.md", "---\ntitle: A\n---\n"),
                ("posts/b.md", "---\ntitle: B\n---\n"),
            ],
            "index.html.jinja",
            None,
        )
        .unwrap();
        assert_eq!(out, "B /posts/b.html;A /posts/a.html;");
    }

    #[test]
    fn test_list_rejects_unknown_kwargs() {
        let err = render(
            &[("index.html.jinja", "{{ ctx.list('*.md', sorted='x') }}")],
            "index.html.jinja",
            None,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_include_with_kwargs() {
        let out = render(
            &[
                ("page.jinja", "{{ ctx.include('.card.jinja', title='Hi', n=2) }}"),
                (".card.jinja", "<h2>{{ title }}</h2>{{ n + 1 }}"),
            ],
            "page.jinja",
            None,
        )
        .unwrap();
        assert_eq!(out, "<h2>Hi</h2>3");
    }

    #[test]
    fn test_paginate_from_template() {
        let out = render(
            &[(
                "list.html.jinja",
                "{% set page = ctx.paginate(range(12), page_size=5) %}{{ page.current_page }}/{{ page.page_count }}:{{ page.items|join(',') }}",
            )],
            "list.html.jinja",
            None,
        )
        .unwrap();
        assert_eq!(out, "1/3:0,1,2,3,4");
    }

    #[test]
    fn test_helpers_and_attributes() {
        let out = render(
            &[(
                "posts/a.html.jinja",
                "---\ndate: 2024-05-06\n---\n{{ ctx.url }}|{{ ctx.file.path }}|{{ ctx.absolutify('b.html') }}|{{ ctx.format_date('2024-05-06', '%Y') }}|{{ ctx.tag_uri() }}",
            )],
            "posts/a.html.jinja",
            Some("https://example.com"),
        )
        .unwrap();
        assert_eq!(
            out,
            "/posts/a.html|posts/a.html.jinja|https://example.com/posts/b.html|2024|tag:example.com,2024-05-06:/posts/a.html"
        );
    }

    #[test]
    fn test_read_json_and_markdown() {
        let out = render(
            &[
                ("page.jinja", "{{ ctx.read_json('site.json').title }}{{ ctx.render_markdown('**x**') }}"),
                ("site.json", r#"{"title": "Quill"}"#),
            ],
            "page.jinja",
            None,
        )
        .unwrap();
        assert_eq!(out, "Quill<p><strong>x</strong></p>\n");
    }

    #[test]
    fn test_unknown_method() {
        assert!(render(&[("p.jinja", "{{ ctx.nope() }}")], "p.jinja", None).is_err());
    }
}
