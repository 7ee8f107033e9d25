//! Splitting a list of items across numbered output pages.
//!
//! For an owner whose primary output is `dir/name.ext`, page `n` is written
//! to `dir/name{n}.ext`, except that `index` pages drop the name:
//!
//! ```text
//! posts.html  →  posts1.html  posts2.html  posts3.html
//! index.html  →  1.html       2.html       3.html
//! ```

use serde::Serialize;

use crate::{
    error::{Error, Result},
    utils::{path as rel, url::public_url},
};

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// One output page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: usize,
    pub output_path: String,
    pub url: String,
}

/// Pages of one file for one build.
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    items: Vec<T>,
    page_size: usize,
    pages: Vec<Page>,
    current_page: usize,
}

/// Snapshot of a paginator handed to templates.
#[derive(Debug, Serialize)]
pub struct PaginatorView<'a, T> {
    pub current_page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub items: &'a [T],
    pub pages: &'a [Page],
    pub previous: Option<&'a Page>,
    pub next: Option<&'a Page>,
}

impl<T> Paginator<T> {
    /// Paginate `items` for the file whose primary output is `output_path`.
    pub fn new(output_path: &str, items: Vec<T>, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::InvalidPageSize);
        }

        let dir = rel::parent_dir(output_path);
        let base = output_path.rsplit('/').next().unwrap_or(output_path);
        let (name, ext) = rel::split_name(base);
        let prefix = if name == "index" { "" } else { name };

        let pages = (1..=items.len().div_ceil(page_size))
            .map(|number| {
                let file = format!("{prefix}{number}{ext}");
                let output_path = if dir.is_empty() {
                    file
                } else {
                    format!("{dir}/{file}")
                };
                Page {
                    number,
                    url: public_url(&output_path),
                    output_path,
                }
            })
            .collect();

        Ok(Self {
            items,
            page_size,
            pages,
            current_page: 1,
        })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Select the page subsequent renders see.
    pub fn set_current_page(&mut self, page: usize) -> Result<()> {
        if page < 1 || page > self.pages.len() {
            return Err(Error::OutOfRange {
                page,
                count: self.pages.len(),
            });
        }
        self.current_page = page;
        Ok(())
    }

    /// Items of the current page.
    pub fn items(&self) -> &[T] {
        let start = ((self.current_page - 1) * self.page_size).min(self.items.len());
        let end = (start + self.page_size).min(self.items.len());
        &self.items[start..end]
    }

    pub fn view(&self) -> PaginatorView<'_, T> {
        let index = self.current_page - 1;
        PaginatorView {
            current_page: self.current_page,
            page_count: self.pages.len(),
            page_size: self.page_size,
            items: self.items(),
            pages: &self.pages,
            previous: index.checked_sub(1).and_then(|i| self.pages.get(i)),
            next: self.pages.get(index + 1),
        }
    }
}
