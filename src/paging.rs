//! Pagination window over a materialized view.
//!
//! `page` is 1-based and always within `[1, page_count]`, so slicing never
//! goes out of range.

use crate::domain::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone)]
pub struct ViewState<T> {
    page: usize,
    page_size: usize,
    view: Vec<T>,
}

/// What the pager line shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerState {
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total: usize,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

impl PagerState {
    pub fn label(&self) -> String {
        format!("{} / {}", self.page, self.page_count)
    }
}

impl Default for PagerState {
    fn default() -> Self {
        PagerState {
            page: 1,
            page_count: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
            prev_enabled: false,
            next_enabled: false,
        }
    }
}

impl<T> ViewState<T> {
    pub fn new(page_size: usize) -> Self {
        ViewState {
            page: 1,
            page_size: Self::sanitize(page_size),
            view: Vec::new(),
        }
    }

    fn sanitize(page_size: usize) -> usize {
        if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size }
    }

    fn clamp(&mut self) {
        self.page = self.page.clamp(1, self.page_count());
    }

    /// Replaces the view and goes back to page 1.
    pub fn set_view(&mut self, view: Vec<T>) {
        self.view = view;
        self.page = 1;
    }

    /// Replaces the view keeping the current page, for re-sorting the same rows.
    pub fn replace_view(&mut self, view: Vec<T>) {
        self.view = view;
        self.clamp();
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn view(&self) -> &[T] {
        &self.view
    }

    pub fn page_count(&self) -> usize {
        self.view.len().div_ceil(self.page_size).max(1)
    }

    pub fn slice_page(&self) -> &[T] {
        let start = self.page_offset().min(self.view.len());
        let end = (start + self.page_size).min(self.view.len());
        &self.view[start..end]
    }

    /// Index into the view of the first row on the current page.
    pub fn page_offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    /// A page size of 0 falls back to the default.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = Self::sanitize(page_size);
        self.page = 1;
    }

    pub fn next_page(&mut self) {
        self.page = (self.page + 1).min(self.page_count());
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn pager(&self) -> PagerState {
        let page_count = self.page_count();
        PagerState {
            page: self.page,
            page_count,
            page_size: self.page_size,
            total: self.view.len(),
            prev_enabled: self.page > 1,
            next_enabled: self.page < page_count,
        }
    }
}
