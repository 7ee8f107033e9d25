//! Input catalog.
//!
//! Every regular file under the input root, keyed by its `/`-separated
//! relative path. Built fresh for each build so listings and includes always
//! see the whole tree, even during a restricted rebuild.

mod front_matter;
mod input;

pub use front_matter::Attributes;
pub use input::{FileView, InputFile, TEMPLATE_KEY};

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use glob::{MatchOptions, Pattern};

use crate::{
    compiler::collect_all_files,
    debug,
    error::{Error, Result},
};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

#[derive(Debug, Default)]
pub struct Catalog {
    root: PathBuf,
    files: BTreeMap<String, Arc<InputFile>>,
}

impl Catalog {
    /// Walk `root` and load every file, skipping the `skip` subtree.
    pub fn scan(root: &Path, skip: Option<&Path>) -> Result<Self> {
        Self::load(root, collect_all_files(root, skip))
    }

    /// Load `paths` under `root`.
    ///
    /// A file deleted between the walk and the read (editor swap files,
    /// atomic saves) is left out.
    fn load(root: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        let mut files = BTreeMap::new();
        for path in paths {
            let file = match InputFile::load(root, path) {
                Ok(file) => file,
                Err(Error::Io { path, source }) if source.kind() == ErrorKind::NotFound => {
                    debug!("scan"; "skipping vanished {}", path.display());
                    continue;
                }
                Err(e) => return Err(e),
            };
            files.insert(file.relative_path.clone(), Arc::new(file));
        }
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, rel: &str) -> Option<&Arc<InputFile>> {
        self.files.get(rel)
    }

    /// All files in relative path order.
    pub fn files(&self) -> impl Iterator<Item = &Arc<InputFile>> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Files whose relative path matches `pattern`, in path order.
    ///
    /// Wildcards never cross `/` and never match a leading `.`.
    pub fn glob(&self, pattern: &str) -> Result<Vec<Arc<InputFile>>> {
        let compiled = Pattern::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(self
            .files
            .iter()
            .filter(|(rel, _)| compiled.matches_with(rel, MATCH_OPTIONS))
            .map(|(_, file)| Arc::clone(file))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing;

    fn rels(files: &[Arc<InputFile>]) -> Vec<&str> {
        files.iter().map(|f| f.relative_path.as_str()).collect()
    }

    #[test]
    fn test_scan_keys_and_skip() {
        let dir = testing::site(&[
            ("index.md", "# Home"),
            ("posts/a.md", "# A"),
            (".templates/default.jinja", "{{ output.content }}"),
            ("_site/old.html", "stale"),
        ]);
        let skip = dir.path().join("_site");
        let catalog = Catalog::scan(dir.path(), Some(&skip)).unwrap();

        let keys: Vec<_> = catalog.files().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(keys, [".templates/default.jinja", "index.md", "posts/a.md"]);
        assert!(catalog.get("posts/a.md").is_some());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_load_skips_vanished_files() {
        let dir = testing::site(&[("index.md", "# Home")]);
        let paths = [dir.path().join("index.md"), dir.path().join(".index.md.swp")];

        let catalog = Catalog::load(dir.path(), paths).unwrap();
        assert_eq!(catalog.files().map(|f| f.relative_path.as_str()).collect::<Vec<_>>(), ["index.md"]);

        // Other read errors still fail the scan
        let result = Catalog::load(dir.path(), [dir.path().to_path_buf()]);
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_glob_matching() {
        let dir = testing::site(&[
            ("posts/a.md", ""),
            ("posts/b.md", ""),
            ("posts/nested/c.md", ""),
            ("posts/.draft.md", ""),
            ("about.md", ""),
        ]);
        let catalog = Catalog::scan(dir.path(), None).unwrap();

        assert_eq!(rels(&catalog.glob("posts/*.md").unwrap()), ["posts/a.md", "posts/b.md"]);
        assert_eq!(rels(&catalog.glob("posts/**/*.md").unwrap()), [
            "posts/a.md",
            "posts/b.md",
            "posts/nested/c.md"
        ]);
        assert_eq!(rels(&catalog.glob("posts/.draft.md").unwrap()), ["posts/.draft.md"]);
        assert!(catalog.glob("missing/*.md").unwrap().is_empty());
    }

    #[test]
    fn test_glob_invalid_pattern() {
        let catalog = Catalog::default();
        assert!(matches!(
            catalog.glob("posts/[.md"),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
