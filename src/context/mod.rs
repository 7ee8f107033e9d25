//! Build-scoped shared state.
//!
//! One [`GlobalContext`] exists per build pass. It owns the catalog and
//! records what rendering discovers: dependency edges, the always-rebuild
//! set, paginators and which files were rendered. Each input file gets one
//! memoized [`FileContext`], the facade templates see as `ctx`.
//!
//! ```text
//!                 ┌──────────────── GlobalContext ────────────────┐
//!                 │ catalog   base_url   Mutex<Recording>          │
//!                 └───────▲───────────────────────▲───────────────┘
//!                   Weak  │                 Weak  │
//!              FileContext(post.md)   FileContext(.templates/default.jinja)
//! ```
//!
//! The recording lock is only held for bookkeeping, never while a processor
//! or template runs, so nested includes can re-enter freely.

mod file;
mod object;

pub use file::{FileContext, SortKind, SortOrder, SortSpec};

use std::{
    path::Path,
    sync::{
        Arc, Weak,
        atomic::{AtomicUsize, Ordering},
    },
};

use minijinja::Value;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    catalog::{Catalog, InputFile},
    compiler::{
        deps::{DependencyGraph, DependencyRecord},
        pagination::{Page, Paginator},
    },
    error::{Error, Result},
};

/// Nested `include` calls allowed before assuming a cycle.
pub const MAX_INCLUDE_DEPTH: usize = 32;

#[derive(Default)]
struct Recording {
    graph: DependencyGraph,
    always_rebuild: FxHashSet<String>,
    touched: FxHashSet<String>,
    paginators: FxHashMap<String, Paginator<Value>>,
    file_contexts: FxHashMap<String, Arc<FileContext>>,
}

pub struct GlobalContext {
    me: Weak<GlobalContext>,
    catalog: Catalog,
    base_url: Option<String>,
    include_depth: AtomicUsize,
    recording: Mutex<Recording>,
}

impl GlobalContext {
    pub fn new(catalog: Catalog, base_url: Option<&str>) -> Arc<Self> {
        let mut recording = Recording::default();
        for file in catalog.files() {
            recording.graph.add_node(&file.relative_path);
        }
        let base_url = base_url.map(|url| url.trim_end_matches('/').to_owned());

        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            catalog,
            base_url,
            include_depth: AtomicUsize::new(0),
            recording: Mutex::new(recording),
        })
    }

    /// Scan `root` into a fresh catalog.
    pub fn scan(root: &Path, skip: Option<&Path>, base_url: Option<&str>) -> Result<Arc<Self>> {
        Ok(Self::new(Catalog::scan(root, skip)?, base_url))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The memoized context of `file`.
    pub fn file_context(&self, file: &Arc<InputFile>) -> Arc<FileContext> {
        let mut recording = self.recording.lock();
        let ctx = recording
            .file_contexts
            .entry(file.relative_path.clone())
            .or_insert_with(|| Arc::new(FileContext::new(Arc::clone(file), self.me.clone())));
        Arc::clone(ctx)
    }

    /// Record that rendering `from` read `to`.
    pub fn add_dependency(&self, from: &str, to: &str) {
        self.recording.lock().graph.add_dependency(from, to);
    }

    pub fn mark_always_rebuild(&self, rel: &str) {
        self.recording.lock().always_rebuild.insert(rel.to_owned());
    }

    /// Record that `rel` was rendered standalone this pass.
    pub fn mark_touched(&self, rel: &str) {
        self.recording.lock().touched.insert(rel.to_owned());
    }

    /// Paginator view for `rel`, creating the paginator on first use.
    pub(crate) fn paginate(
        &self,
        rel: &str,
        output_path: &str,
        items: impl FnOnce() -> Vec<Value>,
        page_size: usize,
    ) -> Result<Value> {
        let mut recording = self.recording.lock();
        if !recording.paginators.contains_key(rel) {
            let paginator = Paginator::new(output_path, items(), page_size)?;
            recording.paginators.insert(rel.to_owned(), paginator);
        }
        Ok(recording
            .paginators
            .get(rel)
            .map_or(Value::UNDEFINED, |p| Value::from_serialize(p.view())))
    }

    /// Pages of `rel`, if it paginated during this pass.
    pub fn pages(&self, rel: &str) -> Option<Vec<Page>> {
        self.recording
            .lock()
            .paginators
            .get(rel)
            .map(|p| p.pages().to_vec())
    }

    pub fn set_current_page(&self, rel: &str, page: usize) -> Result<()> {
        match self.recording.lock().paginators.get_mut(rel) {
            Some(paginator) => paginator.set_current_page(page),
            None => Err(Error::OutOfRange { page, count: 0 }),
        }
    }

    /// Track one level of include nesting for `path`.
    pub(crate) fn enter_include(&self, path: &str) -> Result<IncludeGuard<'_>> {
        let depth = self.include_depth.fetch_add(1, Ordering::SeqCst);
        let guard = IncludeGuard {
            depth: &self.include_depth,
        };
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(Error::IncludeDepth {
                path: path.to_owned(),
            });
        }
        Ok(guard)
    }

    /// Hand over everything recorded during the pass.
    pub fn finish(&self, full: bool, failed: FxHashSet<String>) -> DependencyRecord {
        let mut recording = self.recording.lock();
        let Recording {
            graph,
            always_rebuild,
            touched,
            ..
        } = std::mem::take(&mut *recording);
        DependencyRecord {
            full,
            graph,
            always_rebuild,
            touched,
            failed,
        }
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> (DependencyGraph, FxHashSet<String>) {
        let recording = self.recording.lock();
        (recording.graph.clone(), recording.always_rebuild.clone())
    }
}

/// Decrements the include depth on drop.
pub(crate) struct IncludeGuard<'a> {
    depth: &'a AtomicUsize,
}

impl Drop for IncludeGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}
