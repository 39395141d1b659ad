// src/filters.rs
//! Row filtering: free-text search combined with category/location selectors

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pagination::{PageInfo, Paginator};

// ==================== ROW CONTRACT ====================

/// A record the filter engine can query. Implementations decide which fields
/// take part in the free-text search and in what order.
pub trait FilterableRow {
    fn row_id(&self) -> i64;

    fn search_fields(&self) -> Vec<Option<&str>>;

    fn category(&self) -> Option<&str> {
        None
    }

    fn location(&self) -> Option<&str> {
        None
    }
}

// ==================== FILTER STATE ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub text: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.needle().is_none() && active(&self.category).is_none() && active(&self.location).is_none()
    }

    fn needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
    }

    pub fn matches<T: FilterableRow>(&self, row: &T) -> bool {
        self.matches_with(row, self.needle().as_deref())
    }

    fn matches_with<T: FilterableRow>(&self, row: &T, needle: Option<&str>) -> bool {
        let text_hit = match needle {
            None => true,
            Some(needle) => row
                .search_fields()
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle)),
        };
        let category_hit = match active(&self.category) {
            None => true,
            Some(c) => row.category() == Some(c),
        };
        let location_hit = match active(&self.location) {
            None => true,
            Some(l) => row.location() == Some(l),
        };
        text_hit && category_hit && location_hit
    }
}

/// Rows passing every active dimension, in source order. Never mutates `rows`.
pub fn apply<'a, T: FilterableRow>(rows: &'a [T], state: &FilterState) -> Vec<&'a T> {
    let needle = state.needle();
    let out: Vec<&T> = rows
        .iter()
        .filter(|row| state.matches_with(*row, needle.as_deref()))
        .collect();
    debug!(total = rows.len(), visible = out.len(), "filter applied");
    out
}

// ==================== SELECTOR OPTIONS ====================

/// Distinct selector values, always derived from the full row set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub locations: Vec<String>,
}

impl FilterOptions {
    pub fn from_rows<T: FilterableRow>(rows: &[T]) -> Self {
        let mut categories = BTreeSet::new();
        let mut locations = BTreeSet::new();
        for row in rows {
            if let Some(c) = row.category().filter(|c| !c.is_empty()) {
                categories.insert(c.to_string());
            }
            if let Some(l) = row.location().filter(|l| !l.is_empty()) {
                locations.insert(l.to_string());
            }
        }
        Self {
            categories: categories.into_iter().collect(),
            locations: locations.into_iter().collect(),
        }
    }
}

// ==================== FILTERED TABLE ====================

/// Source rows plus filter state, selector options and pagination.
#[derive(Debug, Clone)]
pub struct FilteredTable<T> {
    rows: Vec<T>,
    state: FilterState,
    options: FilterOptions,
    paginator: Paginator,
}

impl<T: FilterableRow> Default for FilteredTable<T> {
    fn default() -> Self {
        Self::new(Paginator::default())
    }
}

impl<T: FilterableRow> FilteredTable<T> {
    pub fn new(paginator: Paginator) -> Self {
        Self {
            rows: Vec::new(),
            state: FilterState::default(),
            options: FilterOptions::default(),
            paginator,
        }
    }

    /// Replaces the source set and recomputes selector options from it.
    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.options = FilterOptions::from_rows(&rows);
        self.rows = rows;
        let total = self.visible().len();
        self.paginator.clamp(total);
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn set_state(&mut self, state: FilterState) {
        self.state = state;
        self.paginator.first_page();
    }

    pub fn set_text(&mut self, text: &str) {
        self.state.text = Some(text.trim().to_string());
        self.paginator.first_page();
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.state.category = category;
        self.paginator.first_page();
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.state.location = location;
        self.paginator.first_page();
    }

    pub fn clear_filters(&mut self) {
        self.set_state(FilterState::default());
    }

    pub fn visible(&self) -> Vec<&T> {
        apply(&self.rows, &self.state)
    }

    pub fn page(&self) -> Vec<&T> {
        let visible = self.visible();
        self.paginator.slice(&visible).to_vec()
    }

    pub fn page_info(&self) -> PageInfo {
        self.paginator.info(self.visible().len())
    }

    pub fn next_page(&mut self) -> bool {
        let total = self.visible().len();
        self.paginator.next_page(total)
    }

    pub fn prev_page(&mut self) -> bool {
        self.paginator.prev_page()
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn find(&self, id: i64) -> Option<&T> {
        self.rows.iter().find(|r| r.row_id() == id)
    }
}
