//! Page-number pagination over ordered collections.
//!
//! Listing pages count the matching rows first, then ask storage for a single
//! offset/limit slice. [`Paginator::locate`] turns the raw `page` query
//! parameter into that slice; [`Page`] carries the result to the templates.

use std::ops::RangeInclusive;

use serde::Serialize;

/// Posts shown per listing page.
pub const POSTS_PER_PAGE: u64 = 10;

/// Offset-based paginator keyed by a 1-based page number.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u64,
}

/// The slice of a collection selected for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
    pub limit: u64,
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

    /// Number of pages for `count` items. An empty collection still has one page.
    pub fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.per_page).max(1)
    }

    /// Resolve the raw `page` parameter against a collection of `count` items.
    ///
    /// Missing or non-numeric values select the first page; numbers outside
    /// `1..=num_pages` clamp to the nearest valid page.
    pub fn locate(&self, raw_page: Option<&str>, count: u64) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match raw_page.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n < 1 => 1,
            Some(Ok(n)) => (n as u64).min(num_pages),
            _ => 1,
        };

        PageWindow {
            number,
            num_pages,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }

    /// Wrap a fetched slice into a page.
    pub fn page<T>(&self, window: PageWindow, count: u64, object_list: Vec<T>) -> Page<T> {
        Page {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count,
            per_page: self.per_page,
        }
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(POSTS_PER_PAGE)
    }
}

/// A single page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub object_list: Vec<T>,
    /// Current page number (1-based).
    pub number: u64,
    /// Total number of pages.
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub count: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn page_range(&self) -> RangeInclusive<u64> {
        1..=self.num_pages
    }

    /// 1-based index of the first item on this page, 0 when empty.
    pub fn start_index(&self) -> u64 {
        if self.object_list.is_empty() {
            0
        } else {
            (self.number - 1) * self.per_page + 1
        }
    }

    /// 1-based index of the last item on this page, 0 when empty.
    pub fn end_index(&self) -> u64 {
        if self.object_list.is_empty() {
            0
        } else {
            self.start_index() + self.object_list.len() as u64 - 1
        }
    }

    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifteen_items_split_ten_and_five() {
        let paginator = Paginator::default();

        let first = paginator.locate(None, 15);
        assert_eq!(first.number, 1);
        assert_eq!(first.num_pages, 2);
        assert_eq!((first.offset, first.limit), (0, 10));

        let second = paginator.locate(Some("2"), 15);
        assert_eq!(second.number, 2);
        assert_eq!(second.offset, 10);
    }

    #[test]
    fn test_out_of_range_clamps_to_last_page() {
        let paginator = Paginator::new(10);
        let window = paginator.locate(Some("99"), 15);
        assert_eq!(window.number, 2);
        assert_eq!(window.offset, 10);
    }

    #[test]
    fn test_zero_and_negative_clamp_to_first_page() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.locate(Some("0"), 15).number, 1);
        assert_eq!(paginator.locate(Some("-3"), 15).number, 1);
    }

    #[test]
    fn test_garbage_selects_first_page() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.locate(Some("abc"), 15).number, 1);
        assert_eq!(paginator.locate(Some(""), 15).number, 1);
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        let paginator = Paginator::new(10);
        let window = paginator.locate(Some("3"), 0);
        assert_eq!(window.num_pages, 1);
        assert_eq!(window.number, 1);
        assert_eq!(window.offset, 0);

        let page: Page<i32> = paginator.page(window, 0, vec![]);
        assert!(page.is_empty());
        assert_eq!(page.start_index(), 0);
        assert!(!page.has_other_pages());
    }

    #[test]
    fn test_page_navigation() {
        let paginator = Paginator::new(10);
        let window = paginator.locate(Some("2"), 25);
        let page = paginator.page(window, 25, (11..=20).collect::<Vec<_>>());

        assert!(page.has_next());
        assert!(page.has_previous());
        assert_eq!(page.next_page_number(), Some(3));
        assert_eq!(page.previous_page_number(), Some(1));
        assert_eq!(page.start_index(), 11);
        assert_eq!(page.end_index(), 20);
        assert_eq!(page.page_range().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
