//! Relative path helpers.
//!
//! Input files are keyed by their path relative to the input root, always
//! written with forward slashes (`posts/hello.md`) so keys are stable across
//! platforms and can be matched directly against glob patterns.

use std::{
    env,
    path::{Component, Path, PathBuf},
};

/// Convert a path relative to the input root into its forward-slash key.
pub fn to_rel_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `.` and `..` segments of a relative key.
///
/// Returns `None` when the path climbs above the root.
pub fn normalize_rel(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            _ => parts.push(part),
        }
    }
    Some(parts.join("/"))
}

/// Join `path` onto the directory key `dir`.
///
/// A leading `/` makes `path` relative to the input root instead.
pub fn join_rel(dir: &str, path: &str) -> Option<String> {
    if let Some(rooted) = path.strip_prefix('/') {
        return normalize_rel(rooted);
    }
    if dir.is_empty() {
        normalize_rel(path)
    } else {
        normalize_rel(&format!("{dir}/{path}"))
    }
}

/// Directory part of a relative key (`a/b/c.md` → `a/b`, `c.md` → ``).
pub fn parent_dir(rel: &str) -> &str {
    rel.rfind('/').map_or("", |idx| &rel[..idx])
}

/// Split a base name into name and extension the way `name.ext` reads.
///
/// The extension keeps its dot. A leading dot is part of the name, so
/// `.bashrc` has no extension and `.add.jinja` is `(".add", ".jinja")`.
pub fn split_name(base: &str) -> (&str, &str) {
    match base.rfind('.') {
        Some(idx) if idx > 0 => (&base[..idx], &base[idx..]),
        _ => (base, ""),
    }
}

/// True if any segment of the key starts with `.`.
///
/// Such files are templates, partials or configuration and are never
/// rendered to the output tree on their own.
pub fn is_within_dot_directory(rel: &str) -> bool {
    rel.split('/').any(|segment| segment.starts_with('.'))
}

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name == "4913"
}

/// Normalize a path to absolute form for reliable comparison.
///
/// Watcher events report canonical paths, so the input root is
/// canonicalized once up front and compared against them.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}
