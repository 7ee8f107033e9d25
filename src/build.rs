//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── GlobalContext::scan()   ──► fresh catalog of the whole input tree
//!     ├── TemplateTable::build()  ──► compile .templates/*.jinja
//!     │
//!     ├── for each file in scope (dot directories skipped)
//!     │       ├── binary ──► copy
//!     │       └── text   ──► Renderer::render() ──► write outputs
//!     │                      (failures logged, pass continues)
//!     │
//!     └── publish staging dir ──► output dir
//! ```
//!
//! Outputs go to a private staging directory first, so the dev server never
//! serves a half-written pass.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;

use crate::{
    catalog::InputFile,
    compiler::{
        collect_all_files,
        deps::DependencyRecord,
        render::{Output, Renderer},
        templates::TemplateTable,
    },
    context::GlobalContext,
    debug, log,
};

/// Where to read, where to write.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub base_url: Option<String>,
}

/// Which files a pass renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildScope {
    Full,
    /// Relative input paths.
    Files(FxHashSet<String>),
}

impl BuildScope {
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    fn includes(&self, rel: &str) -> bool {
        match self {
            Self::Full => true,
            Self::Files(files) => files.contains(rel),
        }
    }
}

/// A file whose render failed.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: String,
    pub message: String,
}

#[derive(Debug)]
pub struct BuildReport {
    pub record: DependencyRecord,
    pub rendered: usize,
    pub copied: usize,
    pub failures: Vec<FileFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn log_summary(&self) {
        log!("build"; "rendered {} files, copied {}", self.rendered, self.copied);
        if !self.failures.is_empty() {
            let paths: Vec<_> = self.failures.iter().map(|f| f.path.as_str()).collect();
            log!("build"; "{} failed: {}", paths.len(), paths.join(", "));
        }
    }
}

/// Run one build pass over `scope`.
///
/// Per-file failures are collected in the report; only I/O problems with the
/// staging or output directories abort the pass.
pub fn build_site(options: &BuildOptions, scope: &BuildScope) -> Result<BuildReport> {
    let input = &options.input;
    let skip = (options.output.starts_with(input) && options.output != *input)
        .then_some(options.output.as_path());

    let global = GlobalContext::scan(input, skip, options.base_url.as_deref())
        .with_context(|| format!("Failed to scan input directory: {}", input.display()))?;
    let templates = TemplateTable::build(&global);
    debug!("build"; "{} input files, {} templates", global.catalog().len(), templates.len());
    let renderer = Renderer::new(&global, &templates);

    let staging = tempfile::Builder::new()
        .prefix("quill-")
        .tempdir()
        .context("Failed to create staging directory")?;

    let mut rendered = 0;
    let mut copied = 0;
    let mut failed = FxHashSet::default();
    let mut failures = Vec::new();

    for file in global.catalog().files() {
        let rel = &file.relative_path;
        if file.is_within_dot_directory() || !scope.includes(rel) {
            continue;
        }

        if !file.is_text {
            copy_binary(file, staging.path())?;
            copied += 1;
            continue;
        }

        debug!("render"; "{rel}");
        match renderer.render(file) {
            Ok(outputs) => {
                for output in &outputs {
                    write_output(staging.path(), output)?;
                }
                rendered += 1;
            }
            Err(err) => {
                let message = format!("{:#}", anyhow::Error::new(err));
                log!("error"; "{rel}: {message}");
                failed.insert(rel.clone());
                failures.push(FileFailure {
                    path: rel.clone(),
                    message,
                });
            }
        }
    }

    publish(staging.path(), &options.output)?;

    let record = global.finish(scope.is_full(), failed);
    Ok(BuildReport {
        record,
        rendered,
        copied,
        failures,
    })
}

fn write_output(root: &Path, output: &Output) -> Result<()> {
    let path = root.join(&output.path);
    debug!("write"; "{} ({})", output.path, output.source.relative_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&path, &output.content)
        .with_context(|| format!("Failed to write output: {}", path.display()))
}

fn copy_binary(file: &InputFile, root: &Path) -> Result<()> {
    let path = root.join(&file.relative_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::copy(&file.path, &path)
        .with_context(|| format!("Failed to copy {}", file.path.display()))?;
    Ok(())
}

/// Copy the staged tree over `output`, keeping files the pass did not touch.
fn publish(staging: &Path, output: &Path) -> Result<()> {
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

    for src in collect_all_files(staging, None) {
        let Ok(rel) = src.strip_prefix(staging) else {
            continue;
        };
        let dst = output.join(rel);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::copy(&src, &dst).with_context(|| format!("Failed to publish {}", dst.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compiler::deps::DependencyState, scheduler, utils::testing};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn options(input: &Path, output: &Path) -> BuildOptions {
        BuildOptions {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            base_url: None,
        }
    }

    /// Relative path → bytes of every file under `root`.
    fn tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
        collect_all_files(root, None)
            .into_iter()
            .map(|path| {
                let rel = crate::utils::path::to_rel_key(path.strip_prefix(root).unwrap());
                (rel, fs::read(&path).unwrap())
            })
            .collect()
    }

    fn files(items: &[&str]) -> FxHashSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_post_scenario() {
        let input = testing::site(&[
            ("post.md", "---\ntemplate: default\n---\n# Hi"),
            (".templates/default.jinja", "{{ output.content }}"),
        ]);
        let output = TempDir::new().unwrap();

        let report = build_site(&options(input.path(), output.path()), &BuildScope::Full).unwrap();

        assert!(report.is_success());
        let out = tree(output.path());
        assert_eq!(out.keys().collect::<Vec<_>>(), ["post.html"]);
        assert_eq!(testing::read(output.path(), "post.html"), "<h1>Hi</h1>\n");
    }

    #[test]
    fn test_binary_copied_and_dot_directories_skipped() {
        let input = testing::site(&[
            ("img/logo.png", "\u{0}PNG"),
            (".templates/default.jinja", "{{ output.content }}"),
            (".config/notes.txt", "private"),
            ("robots.txt", "User-agent: *\n"),
        ]);
        let output = TempDir::new().unwrap();

        let report = build_site(&options(input.path(), output.path()), &BuildScope::Full).unwrap();

        assert_eq!((report.rendered, report.copied), (1, 1));
        let out = tree(output.path());
        assert_eq!(out.keys().collect::<Vec<_>>(), ["img/logo.png", "robots.txt"]);
        assert_eq!(out["img/logo.png"], b"\0PNG");
    }

    #[test]
    fn test_idempotent_builds() {
        let input = testing::site(&[
            ("index.html.jinja", "{% for p in ctx.list('posts/*.md', sort='title') %}{{ p.url }}\n{% endfor %}"),
            ("posts/a.md", "---\ntitle: A\n---\n*a*"),
            ("posts/b.md", "---\ntitle: B\n---\n**b**"),
            (".templates/default.jinja", "<main>{{ output.content }}</main>"),
            ("logo.png", "\u{0}\u{1}"),
        ]);
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();

        build_site(&options(input.path(), first.path()), &BuildScope::Full).unwrap();
        build_site(&options(input.path(), second.path()), &BuildScope::Full).unwrap();
        // Rebuilding over an existing output changes nothing either
        build_site(&options(input.path(), first.path()), &BuildScope::Full).unwrap();

        assert_eq!(tree(first.path()), tree(second.path()));
        assert_eq!(
            testing::read(first.path(), "index.html"),
            "/posts/a.html\n/posts/b.html\n"
        );
    }

    #[test]
    fn test_failed_file_writes_nothing_and_pass_continues() {
        let input = testing::site(&[
            ("bad.md", "---\ntemplate: nope\n---\n# Bad"),
            ("good.md", "# Good"),
            (".templates/default.jinja", "{{ output.content }}"),
        ]);
        let output = TempDir::new().unwrap();

        let report = build_site(&options(input.path(), output.path()), &BuildScope::Full).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "bad.md");
        assert!(report.failures[0].message.contains("nope"));
        assert!(report.record.failed.contains("bad.md"));
        assert_eq!(tree(output.path()).keys().collect::<Vec<_>>(), ["good.html"]);
    }

    #[test]
    fn test_output_inside_input_is_skipped() {
        let input = testing::site(&[("a.txt", "a")]);
        let output = input.path().join("_site");

        build_site(&options(input.path(), &output), &BuildScope::Full).unwrap();
        build_site(&options(input.path(), &output), &BuildScope::Full).unwrap();

        assert_eq!(tree(&output).keys().collect::<Vec<_>>(), ["a.txt"]);
    }

    #[test]
    fn test_restricted_build_renders_only_scope() {
        let input = testing::site(&[("a.txt", "a"), ("b.txt", "b")]);
        let output = TempDir::new().unwrap();

        let report = build_site(
            &options(input.path(), output.path()),
            &BuildScope::Files(files(&["b.txt"])),
        )
        .unwrap();

        assert!(!report.record.full);
        assert_eq!(report.record.touched, files(&["b.txt"]));
        assert_eq!(tree(output.path()).keys().collect::<Vec<_>>(), ["b.txt"]);
    }

    #[test]
    fn test_dependency_propagation_through_restricted_rebuild() {
        let input = testing::site(&[
            ("a.jinja", "{% for f in ctx.list('b.jinja') %}{{ ctx.include(f.path) }}{% endfor %}"),
            ("b.jinja", "one"),
            ("c.txt", "c"),
        ]);
        let output = TempDir::new().unwrap();
        let opts = options(input.path(), output.path());

        let report = build_site(&opts, &BuildScope::Full).unwrap();
        let mut state = DependencyState::default();
        state.apply(report.record);
        assert_eq!(testing::read(output.path(), "a"), "one");

        fs::write(input.path().join("b.jinja"), "two").unwrap();
        let rebuild = scheduler::expand(&state, &files(&["b.jinja"]));
        assert!(rebuild.contains("a.jinja"));
        assert!(!rebuild.contains("c.txt"));

        let report = build_site(&opts, &BuildScope::Files(rebuild)).unwrap();
        state.apply(report.record);
        assert_eq!(testing::read(output.path(), "a"), "two");
        assert_eq!(testing::read(output.path(), "b"), "two");
    }

    #[test]
    fn test_always_rebuild_included_in_every_rebuild() {
        let input = testing::site(&[
            ("index.html.jinja", "{{ ctx.list('posts/*.md')|length }}"),
            ("posts/a.md", "---\ntemplate: null\n---\na"),
            ("about.txt", "about"),
        ]);
        let output = TempDir::new().unwrap();
        let opts = options(input.path(), output.path());

        let mut state = DependencyState::default();
        state.apply(build_site(&opts, &BuildScope::Full).unwrap().record);
        assert!(state.always_rebuild.contains("index.html.jinja"));

        // A new post is invisible to the graph but the listing page still rebuilds
        testing::write_files(input.path(), &[("posts/b.md", "---\ntemplate: null\n---\nb")]);
        let rebuild = scheduler::expand(&state, &files(&["posts/b.md"]));
        assert_eq!(rebuild, files(&["posts/b.md", "index.html.jinja"]));

        state.apply(build_site(&opts, &BuildScope::Files(rebuild)).unwrap().record);
        assert_eq!(testing::read(output.path(), "index.html"), "2");

        let rebuild = scheduler::expand(&state, &files(&["about.txt"]));
        assert!(rebuild.contains("index.html.jinja"));
    }

    #[test]
    fn test_failed_file_rebuilt_when_template_appears() {
        let input = testing::site(&[("post.md", "# Post")]);
        let output = TempDir::new().unwrap();
        let opts = options(input.path(), output.path());

        let mut state = DependencyState::default();
        let report = build_site(&opts, &BuildScope::Full).unwrap();
        assert!(!report.is_success());
        state.apply(report.record);

        testing::write_files(input.path(), &[(".templates/default.jinja", "<body>{{ output.content }}</body>")]);
        let rebuild = scheduler::expand(&state, &files(&[".templates/default.jinja"]));
        assert!(rebuild.contains("post.md"));

        let report = build_site(&opts, &BuildScope::Files(rebuild)).unwrap();
        assert!(report.is_success());
        assert_eq!(testing::read(output.path(), "post.html"), "<body><h1>Post</h1>\n</body>");
    }

    #[test]
    fn test_page_rebuilt_when_missing_include_is_created() {
        for include in ["{% include '.parts/nav.jinja' %}", "{{ ctx.include('.parts/nav.jinja') }}"] {
            let input = testing::site(&[("page.html.jinja", "v1")]);
            let output = TempDir::new().unwrap();
            let opts = options(input.path(), output.path());

            let mut state = DependencyState::default();
            let report = build_site(&opts, &BuildScope::Full).unwrap();
            assert!(report.is_success());
            state.apply(report.record);

            let page = format!("[{include}]");
            testing::write_files(input.path(), &[("page.html.jinja", page.as_str())]);
            let rebuild = scheduler::expand(&state, &files(&["page.html.jinja"]));
            let report = build_site(&opts, &BuildScope::Files(rebuild)).unwrap();
            assert!(!report.is_success(), "{include}");
            state.apply(report.record);

            testing::write_files(input.path(), &[(".parts/nav.jinja", "NAV")]);
            let rebuild = scheduler::expand(&state, &files(&[".parts/nav.jinja"]));
            assert!(rebuild.contains("page.html.jinja"), "{include}");

            let report = build_site(&opts, &BuildScope::Files(rebuild)).unwrap();
            assert!(report.is_success(), "{include}");
            assert_eq!(testing::read(output.path(), "page.html"), "[NAV]");
        }
    }
}
