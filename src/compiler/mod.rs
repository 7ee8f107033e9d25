//! Rendering pipeline.
//!
//! - **processors**: fixed registry turning `.md` / `.jinja` sources into output
//! - **markdown**: markdown to HTML with `include` directives
//! - **jinja**: template environment wired to a file context
//! - **templates**: named templates under `.templates/`
//! - **render**: processor → template → pagination for one file
//! - **pagination**: page slicing and page output paths
//! - **deps**: dependency graph and its patching across rebuilds
//!
//! # Render Flow
//!
//! ```text
//!  InputFile ──► Processor ──► Template ──► Output
//!                   │             │
//!                   ▼             ▼
//!               ctx.list()    ctx.include()   ──► DependencyGraph edges
//!                   │
//!                   ▼
//!             ctx.paginate() ──► one extra Output per page
//! ```

pub mod deps;
pub mod jinja;
pub mod markdown;
pub mod pagination;
pub mod processors;
pub mod render;
pub mod templates;

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// ============================================================================
// Shared utilities
// ============================================================================

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Collect all regular files under `dir`, not following symlinks.
///
/// The `skip` subtree (an output directory nested in the input) is pruned.
pub fn collect_all_files(dir: &Path, skip: Option<&Path>) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| skip.is_none_or(|skip| e.path() != skip))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}
