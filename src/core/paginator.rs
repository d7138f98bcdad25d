//! Pagination cursor and stop conditions for one (query, location) harvest.
//!
//! Stop conditions, checked in this order:
//! 1. the page could not be fetched;
//! 2. the page has no result elements;
//! 3. the requested number of postings has been produced, even mid-page;
//! 4. the page held fewer elements than the source's page size;
//! 5. the source's page ceiling has been reached.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageCursor {
    /// Zero-based count of pages already walked.
    pub index: usize,
}

impl PageCursor {
    pub fn at(index: usize) -> Self {
        Self { index }
    }

    /// Results skipped before this page.
    pub fn offset(&self, page_size: usize) -> usize {
        self.index * page_size
    }

    pub fn next(&self) -> Self {
        Self {
            index: self.index + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FetchFailed,
    NoResults,
    LimitReached,
    LastPage,
    PageCeiling,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::FetchFailed => "page fetch failed",
            StopReason::NoResults => "no results on page",
            StopReason::LimitReached => "limit reached",
            StopReason::LastPage => "short page",
            StopReason::PageCeiling => "page ceiling reached",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: usize,
    max_pages: usize,
    limit: usize,
    produced: usize,
    cursor: PageCursor,
    stopped: Option<StopReason>,
}

impl Paginator {
    pub fn new(page_size: usize, max_pages: usize, limit: usize) -> Self {
        let stopped = if limit == 0 {
            Some(StopReason::LimitReached)
        } else if max_pages == 0 {
            Some(StopReason::PageCeiling)
        } else {
            None
        };
        Self {
            page_size,
            max_pages,
            limit,
            produced: 0,
            cursor: PageCursor::default(),
            stopped,
        }
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    pub fn is_finished(&self) -> bool {
        self.stopped.is_some()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    fn stop(&mut self, reason: StopReason) -> StopReason {
        *self.stopped.get_or_insert(reason)
    }

    pub fn fetch_failed(&mut self) -> StopReason {
        self.stop(StopReason::FetchFailed)
    }

    /// Called once the page's result elements are known.
    pub fn page_loaded(&mut self, elements: usize) -> Option<StopReason> {
        if elements == 0 {
            return Some(self.stop(StopReason::NoResults));
        }
        self.stopped
    }

    /// Counts one produced posting; returns true once the limit is reached.
    pub fn record_produced(&mut self) -> bool {
        self.produced += 1;
        if self.produced >= self.limit {
            self.stop(StopReason::LimitReached);
            return true;
        }
        false
    }

    /// Called after a page's elements were processed. Advances the cursor
    /// unless a stop condition holds.
    pub fn page_done(&mut self, elements: usize) -> Option<StopReason> {
        if let Some(reason) = self.stopped {
            return Some(reason);
        }
        if elements < self.page_size {
            return Some(self.stop(StopReason::LastPage));
        }
        self.cursor = self.cursor.next();
        if self.cursor.index >= self.max_pages {
            return Some(self.stop(StopReason::PageCeiling));
        }
        None
    }
}
