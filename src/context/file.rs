//! Per-file facade over the global context.
//!
//! Everything that reads another cataloged file records an edge from this
//! file to the file read.

use std::{
    cmp::Ordering,
    fmt, fs,
    sync::{Arc, Weak},
};

use glob::Pattern;
use minijinja::Value;

use super::GlobalContext;
use crate::{
    catalog::InputFile,
    compiler::{markdown, processors::IncludeArgs},
    error::{Error, Result},
    utils::{date, path::join_rel, url},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKind {
    #[default]
    String,
    Date,
}

/// Sort `list` results by an attribute.
#[derive(Debug, Clone, Default)]
pub struct SortSpec {
    pub attribute: String,
    pub order: SortOrder,
    pub kind: SortKind,
}

pub struct FileContext {
    file: Arc<InputFile>,
    global: Weak<GlobalContext>,
}

impl fmt::Debug for FileContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileContext")
            .field("file", &self.file.relative_path)
            .finish()
    }
}

impl FileContext {
    pub(super) fn new(file: Arc<InputFile>, global: Weak<GlobalContext>) -> Self {
        Self { file, global }
    }

    pub fn file(&self) -> &Arc<InputFile> {
        &self.file
    }

    fn rel(&self) -> &str {
        &self.file.relative_path
    }

    fn global(&self) -> Result<Arc<GlobalContext>> {
        self.global.upgrade().ok_or_else(|| Error::ContextReleased {
            path: self.rel().to_owned(),
        })
    }

    /// Cataloged files matching `pattern` relative to this file's directory.
    ///
    /// `None` when the pattern climbs out of the input root.
    fn resolve(&self, global: &GlobalContext, pattern: &str) -> Result<Option<Vec<Arc<InputFile>>>> {
        let Some(joined) = join_rel(&Pattern::escape(&self.file.dir), pattern) else {
            return Ok(None);
        };
        global.catalog().glob(&joined).map(Some)
    }

    // ========================================================================
    // Listing and includes
    // ========================================================================

    /// Files matching `pattern`, optionally sorted.
    ///
    /// Marks this file always-rebuild: files added later may match too.
    pub fn list(&self, pattern: &str, sort: Option<&SortSpec>) -> Result<Vec<Arc<InputFile>>> {
        let global = self.global()?;
        global.mark_always_rebuild(self.rel());

        let mut files = self.resolve(&global, pattern)?.unwrap_or_default();
        for file in &files {
            global.add_dependency(self.rel(), &file.relative_path);
        }

        if let Some(spec) = sort {
            sort_files(&mut files, spec);
        }
        Ok(files)
    }

    /// Render the single file matching `pattern`.
    ///
    /// Processed through its own processor with `args` as extra variables,
    /// or its raw body when no processor claims it.
    pub fn include(&self, pattern: &str, args: &IncludeArgs) -> Result<String> {
        let global = self.global()?;
        let Some(mut matches) = self.resolve(&global, pattern)? else {
            return Err(Error::InvalidTarget {
                path: pattern.to_owned(),
                reason: "outside the input root",
            });
        };

        let target = match matches.len() {
            0 => {
                // A literal path may be created later; depend on it now
                if !pattern.contains(['*', '?', '['])
                    && let Some(missing) = join_rel(&self.file.dir, pattern)
                {
                    global.add_dependency(self.rel(), &missing);
                }
                return Err(Error::NotFound {
                    pattern: pattern.to_owned(),
                });
            }
            1 => matches.remove(0),
            _ => {
                return Err(Error::AmbiguousMatch {
                    pattern: pattern.to_owned(),
                    matches: matches.iter().map(|f| f.relative_path.clone()).collect(),
                });
            }
        };

        if !target.is_text {
            return Err(Error::InvalidTarget {
                path: target.relative_path.clone(),
                reason: "binary file",
            });
        }

        global.add_dependency(self.rel(), &target.relative_path);
        let _depth = global.enter_include(&target.relative_path)?;

        match target.processor {
            Some(processor) => {
                let ctx = global.file_context(&target);
                processor.process(&target, &ctx, args)
            }
            None => Ok(target.body.clone().unwrap_or_default()),
        }
    }

    /// Template loader hook: source of the template file `name`.
    ///
    /// `Ok(None)` lets the engine report a missing template. The edge is
    /// recorded either way, so creating the file later triggers a rebuild.
    pub fn include_source(&self, name: &str) -> Result<Option<String>> {
        let global = self.global()?;
        let Some(target) = global.catalog().get(name) else {
            global.add_dependency(self.rel(), name);
            return Ok(None);
        };
        if !target.is_text {
            return Err(Error::InvalidTarget {
                path: name.to_owned(),
                reason: "binary file",
            });
        }
        global.add_dependency(self.rel(), name);
        Ok(target.body.clone())
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Current page of `items` for this file.
    pub fn paginate(&self, items: Vec<Value>, page_size: usize) -> Result<Value> {
        if self.file.is_template() {
            return Err(Error::InTemplateNotAllowed {
                path: self.rel().to_owned(),
            });
        }
        let global = self.global()?;
        global.paginate(self.rel(), &self.file.output_path(), || items, page_size)
    }

    // ========================================================================
    // Data and helpers
    // ========================================================================

    /// Resolve `target` as the page at this file's URL would.
    pub fn absolutify(&self, target: &str) -> Result<String> {
        let global = self.global()?;
        let base = global.base_url().ok_or(Error::MissingBaseUrl)?;
        Ok(url::resolve(base, &self.file.url(), target))
    }

    /// Parse a JSON file relative to this file.
    pub fn read_json(&self, path: &str) -> Result<serde_json::Value> {
        let global = self.global()?;
        let rel = join_rel(&self.file.dir, path).ok_or_else(|| Error::InvalidTarget {
            path: path.to_owned(),
            reason: "outside the input root",
        })?;

        let abs = global.catalog().root().join(&rel);
        let text = fs::read_to_string(&abs).map_err(|source| Error::Io { path: abs, source })?;
        if global.catalog().get(&rel).is_some() {
            global.add_dependency(self.rel(), &rel);
        }
        serde_json::from_str(&text).map_err(|source| Error::Json { path: rel, source })
    }

    pub fn render_markdown(&self, text: &str) -> String {
        markdown::render(text)
    }

    pub fn format_date(&self, value: &str, pattern: &str) -> Result<String> {
        date::format(value, pattern)
    }

    pub fn now(&self) -> String {
        date::now()
    }

    pub fn current_url(&self) -> String {
        self.file.url()
    }

    /// RFC 4151 tag URI for this file, dated `date` or its `date` attribute.
    pub fn tag_uri(&self, when: Option<&str>) -> Result<String> {
        let global = self.global()?;
        let base = global.base_url().ok_or(Error::MissingBaseUrl)?;
        let value = when
            .or_else(|| self.file.attribute_str("date"))
            .ok_or_else(|| Error::InvalidDate {
                value: format!("missing `date` attribute in {}", self.rel()),
            })?;
        let parsed = date::parse_strict(value)?;
        Ok(format!(
            "tag:{},{}:{}",
            url::host(base),
            date::ymd(&parsed),
            self.file.url()
        ))
    }
}

/// Sort by attribute; missing values go last, `Desc` reverses everything.
fn sort_files(files: &mut [Arc<InputFile>], spec: &SortSpec) {
    match spec.kind {
        SortKind::String => {
            files.sort_by(|a, b| cmp_missing_last(string_key(a, spec), string_key(b, spec)));
        }
        SortKind::Date => files.sort_by(|a, b| {
            let key = |f: &InputFile| {
                f.attribute_str(&spec.attribute)
                    .and_then(date::parse)
                    .map(|d| d.timestamp())
            };
            cmp_missing_last(key(a), key(b))
        }),
    }
    if spec.order == SortOrder::Desc {
        files.reverse();
    }
}

fn string_key(file: &InputFile, spec: &SortSpec) -> Option<String> {
    match file.attributes.get(&spec.attribute)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn cmp_missing_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing;
    use pretty_assertions::assert_eq;

    fn ctx_for(global: &Arc<GlobalContext>, rel: &str) -> Arc<FileContext> {
        let file = global.catalog().get(rel).cloned().unwrap();
        global.file_context(&file)
    }

    fn rels(files: &[Arc<InputFile>]) -> Vec<&str> {
        files.iter().map(|f| f.relative_path.as_str()).collect()
    }

    fn blog() -> tempfile::TempDir {
        testing::site(&[
            ("index.html.jinja", ""),
            ("posts/a.md", "---\ntitle: Banana\ndate: 2024-03-01\n---\nA"),
            ("posts/b.md", "---\ntitle: Apple\ndate: 2023-12-31\n---\nB"),
            ("posts/c.md", "---\ndate: 2024-01-15\n---\nC"),
            ("posts/logo.png", "png"),
            ("data.json", r#"{"name": "quill"}"#),
            (".parts/hello.jinja", "hello {{ who }}"),
            (".parts/raw.txt", "raw text"),
        ])
    }

    #[test]
    fn test_list_relative_and_records_edges() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "index.html.jinja");

        let files = ctx.list("posts/*.md", None).unwrap();
        assert_eq!(rels(&files), ["posts/a.md", "posts/b.md", "posts/c.md"]);

        let (graph, always) = global.snapshot();
        let mut deps: Vec<_> = graph.dependencies_of("index.html.jinja").collect();
        deps.sort_unstable();
        assert_eq!(deps, ["posts/a.md", "posts/b.md", "posts/c.md"]);
        assert!(always.contains("index.html.jinja"));
    }

    #[test]
    fn test_list_zero_matches_is_empty() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "posts/a.md");

        assert!(ctx.list("drafts/*.md", None).unwrap().is_empty());
        assert!(ctx.list("../../*.md", None).unwrap().is_empty());
        assert_eq!(rels(&ctx.list("*.md", None).unwrap()).len(), 3);
    }

    #[test]
    fn test_list_sorting() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "index.html.jinja");

        let by_title = SortSpec {
            attribute: "title".into(),
            ..Default::default()
        };
        let files = ctx.list("posts/*.md", Some(&by_title)).unwrap();
        assert_eq!(rels(&files), ["posts/b.md", "posts/a.md", "posts/c.md"]);

        let newest_first = SortSpec {
            attribute: "date".into(),
            order: SortOrder::Desc,
            kind: SortKind::Date,
        };
        let files = ctx.list("posts/*.md", Some(&newest_first)).unwrap();
        assert_eq!(rels(&files), ["posts/a.md", "posts/c.md", "posts/b.md"]);
    }

    #[test]
    fn test_include_processes_target() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "index.html.jinja");

        let args = IncludeArgs::from([("who".to_owned(), Value::from("world"))]);
        assert_eq!(ctx.include(".parts/hello.jinja", &args).unwrap(), "hello world");
        assert_eq!(ctx.include(".parts/raw.txt", &IncludeArgs::new()).unwrap(), "raw text");

        let (graph, always) = global.snapshot();
        let mut deps: Vec<_> = graph.dependencies_of("index.html.jinja").collect();
        deps.sort_unstable();
        assert_eq!(deps, [".parts/hello.jinja", ".parts/raw.txt"]);
        assert!(!always.contains("index.html.jinja"));
    }

    #[test]
    fn test_include_errors() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "index.html.jinja");
        let args = IncludeArgs::new();

        assert!(matches!(ctx.include("nope.md", &args), Err(Error::NotFound { .. })));
        assert!(matches!(
            ctx.include("posts/*.md", &args),
            Err(Error::AmbiguousMatch { matches, .. }) if matches.len() == 3
        ));
        assert!(matches!(
            ctx.include("posts/logo.png", &args),
            Err(Error::InvalidTarget { reason: "binary file", .. })
        ));
        assert!(matches!(
            ctx.include("../outside.md", &args),
            Err(Error::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_include_cycle_is_bounded() {
        // Nested renders are deep; give them the same headroom as a build worker
        let chain = std::thread::Builder::new()
            .stack_size(64 << 20)
            .spawn(|| {
                let dir = testing::site(&[
                    (".a.jinja", "{{ ctx.include('.b.jinja') }}"),
                    (".b.jinja", "{{ ctx.include('.a.jinja') }}"),
                    ("page.jinja", ""),
                ]);
                let global = GlobalContext::scan(dir.path(), None, None).unwrap();
                let ctx = ctx_for(&global, "page.jinja");

                let err = ctx.include(".a.jinja", &IncludeArgs::new()).unwrap_err();
                let mut chain = vec![err.to_string()];
                let mut source = std::error::Error::source(&err);
                while let Some(cause) = source {
                    chain.push(cause.to_string());
                    source = cause.source();
                }
                chain
            })
            .unwrap()
            .join()
            .unwrap();

        assert!(chain.iter().any(|msg| msg.contains("include depth exceeded")));
    }

    #[test]
    fn test_include_source_records_edge() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "index.html.jinja");

        assert_eq!(
            ctx.include_source(".parts/raw.txt").unwrap().as_deref(),
            Some("raw text")
        );
        assert_eq!(ctx.include_source("missing.jinja").unwrap(), None);

        let (graph, _) = global.snapshot();
        let mut deps: Vec<_> = graph.dependencies_of("index.html.jinja").collect();
        deps.sort_unstable();
        assert_eq!(deps, [".parts/raw.txt", "missing.jinja"]);
    }

    #[test]
    fn test_include_missing_literal_records_edge() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "posts/a.md");
        let args = IncludeArgs::new();

        assert!(matches!(ctx.include("../.parts/nav.jinja", &args), Err(Error::NotFound { .. })));
        assert!(matches!(ctx.include("drafts/*.md", &args), Err(Error::NotFound { .. })));

        // Only the literal path is recorded; a glob has no single file to wait for
        let (graph, _) = global.snapshot();
        assert_eq!(
            graph.dependencies_of("posts/a.md").collect::<Vec<_>>(),
            [".parts/nav.jinja"]
        );
    }

    #[test]
    fn test_paginate_disallowed_in_templates() {
        let dir = testing::site(&[(".templates/list.jinja", "")]);
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, ".templates/list.jinja");

        assert!(matches!(
            ctx.paginate(vec![Value::from(1)], 5),
            Err(Error::InTemplateNotAllowed { .. })
        ));
    }

    #[test]
    fn test_paginate_is_created_once() {
        let dir = testing::site(&[("index.html.jinja", "")]);
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "index.html.jinja");

        let items: Vec<Value> = (1..=12).map(Value::from).collect();
        let first = ctx.paginate(items, 5).unwrap();
        assert_eq!(first.get_attr("page_count").unwrap().as_usize(), Some(3));

        // Later calls reuse the first item list and page size
        let second = ctx.paginate(Vec::new(), 2).unwrap();
        assert_eq!(second.get_attr("page_size").unwrap().as_usize(), Some(5));

        let pages = global.pages("index.html.jinja").unwrap();
        assert_eq!(pages[2].output_path, "3.html");
    }

    #[test]
    fn test_absolutify() {
        let dir = testing::site(&[("posts/a.md", "")]);
        let global = GlobalContext::scan(dir.path(), None, Some("https://example.com/")).unwrap();
        let ctx = ctx_for(&global, "posts/a.md");
        assert_eq!(ctx.absolutify("img.png").unwrap(), "https://example.com/posts/img.png");
        assert_eq!(ctx.absolutify("/").unwrap(), "https://example.com/");

        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "posts/a.md");
        assert!(matches!(ctx.absolutify("x"), Err(Error::MissingBaseUrl)));
    }

    #[test]
    fn test_read_json() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "posts/a.md");

        let data = ctx.read_json("../data.json").unwrap();
        assert_eq!(data["name"], "quill");
        let (graph, _) = global.snapshot();
        assert_eq!(graph.dependencies_of("posts/a.md").collect::<Vec<_>>(), ["data.json"]);

        assert!(matches!(ctx.read_json("missing.json"), Err(Error::Io { .. })));
        assert!(matches!(ctx.read_json("a.md"), Err(Error::Json { .. })));
    }

    #[test]
    fn test_tag_uri() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, Some("https://example.com")).unwrap();
        let ctx = ctx_for(&global, "posts/a.md");

        assert_eq!(ctx.tag_uri(None).unwrap(), "tag:example.com,2024-03-01:/posts/a.html");
        assert_eq!(
            ctx.tag_uri(Some("2020-01-02")).unwrap(),
            "tag:example.com,2020-01-02:/posts/a.html"
        );
    }

    #[test]
    fn test_helpers() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "posts/a.md");

        assert_eq!(ctx.render_markdown("*hi*"), "<p><em>hi</em></p>\n");
        assert_eq!(ctx.format_date("2024-03-01", "%d/%m/%Y").unwrap(), "01/03/2024");
        assert_eq!(ctx.current_url(), "/posts/a.html");
        assert!(!ctx.now().is_empty());
    }

    #[test]
    fn test_released_global() {
        let dir = blog();
        let global = GlobalContext::scan(dir.path(), None, None).unwrap();
        let ctx = ctx_for(&global, "posts/a.md");
        drop(global);

        assert!(matches!(ctx.list("*.md", None), Err(Error::ContextReleased { .. })));
    }
}
