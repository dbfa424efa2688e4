//! Page-number pagination over repository listings
//!
//! The paginator only does arithmetic: it resolves the requested page number
//! against a row count and hands back `limit`/`offset` for the query, so a
//! listing never loads more than one page of rows.

use serde::{Deserialize, Serialize};

/// Posts per page on every listing
pub const POSTS_PER_PAGE: u64 = 10;

/// `?page=N` query parameter
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(POSTS_PER_PAGE)
    }
}

impl Paginator {
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// An empty collection still has one (empty) page
    pub fn num_pages(&self, count: u64) -> u64 {
        if count == 0 {
            1
        } else {
            count.div_ceil(self.per_page)
        }
    }

    /// Resolve a raw `page` parameter: anything but an integer (including
    /// "2.0") → first page, out of range (including zero and negatives) →
    /// last page.
    pub fn page_number(&self, raw: Option<&str>, count: u64) -> u64 {
        let num_pages = self.num_pages(count);
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return 1;
        };
        match raw.parse::<i64>().ok() {
            None => 1,
            Some(n) if n < 1 || n as u64 > num_pages => num_pages,
            Some(n) => n as u64,
        }
    }

    /// `(limit, offset)` for a resolved page number
    pub fn bounds(&self, number: u64) -> (u64, u64) {
        (self.per_page, (number.max(1) - 1) * self.per_page)
    }

    pub fn page<T>(&self, object_list: Vec<T>, number: u64, count: u64) -> Page<T> {
        let num_pages = self.num_pages(count);
        Page {
            object_list,
            number,
            num_pages,
            count,
            has_next: number < num_pages,
            has_previous: number > 1,
            next_page_number: (number < num_pages).then_some(number + 1),
            previous_page_number: (number > 1).then(|| number - 1),
            page_range: (1..=num_pages).collect(),
        }
    }
}

/// One page of a listing, as handed to templates under `page_obj`
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
    pub page_range: Vec<u64>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.object_list.iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.object_list.iter()
    }
}
