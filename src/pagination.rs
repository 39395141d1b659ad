// src/pagination.rs
//! Page-based pagination over an in-memory slice

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_index: usize,
    page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn first_page(&mut self) {
        self.page_index = 0;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self.first_page();
    }

    pub fn page_count(&self, total: usize) -> usize {
        if total == 0 {
            0
        } else {
            (total + self.page_size - 1) / self.page_size
        }
    }

    pub fn next_page(&mut self, total: usize) -> bool {
        if self.page_index + 1 < self.page_count(total) {
            self.page_index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page_index > 0 {
            self.page_index -= 1;
            true
        } else {
            false
        }
    }

    fn effective_index(&self, total: usize) -> usize {
        self.page_index.min(self.page_count(total).saturating_sub(1))
    }

    /// Pulls the index back onto the last page after the set shrank.
    pub fn clamp(&mut self, total: usize) {
        self.page_index = self.effective_index(total);
    }

    /// Current page of `items`. An index past the end yields the last page.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        if items.is_empty() {
            return &items[..0];
        }
        let start = self.effective_index(items.len()) * self.page_size;
        let end = (start + self.page_size).min(items.len());
        &items[start..end]
    }

    pub fn info(&self, total: usize) -> PageInfo {
        PageInfo {
            page: self.effective_index(total) + 1,
            per_page: self.page_size,
            total,
            total_pages: self.page_count(total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(Paginator::new(0).page_size(), 1);
        assert_eq!(Paginator::new(500).page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_slicing_and_navigation() {
        let items: Vec<i32> = (1..=25).collect();
        let mut p = Paginator::new(10);

        assert_eq!(p.slice(&items), &items[0..10]);
        assert!(p.next_page(items.len()));
        assert!(p.next_page(items.len()));
        assert_eq!(p.slice(&items), &items[20..25]);
        assert!(!p.next_page(items.len()));

        p.first_page();
        assert_eq!(p.page_index(), 0);
        assert!(!p.prev_page());
    }

    #[test]
    fn test_index_past_end_shows_last_page() {
        let items: Vec<i32> = (1..=25).collect();
        let mut p = Paginator::new(10);
        p.next_page(items.len());
        p.next_page(items.len());

        let shrunk = &items[0..5];
        assert_eq!(p.slice(shrunk), shrunk);
        assert_eq!(p.info(shrunk.len()).page, 1);
        assert_eq!(p.info(items.len()).page, 3);

        p.clamp(shrunk.len());
        assert_eq!(p.page_index(), 0);
        assert!(!p.prev_page());
    }

    #[test]
    fn test_info() {
        let p = Paginator::new(10);
        let info = p.info(21);
        assert_eq!(info.page, 1);
        assert_eq!(info.total_pages, 3);
        assert_eq!(p.info(0).total_pages, 0);
    }
}
