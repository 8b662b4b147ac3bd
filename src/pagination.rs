//! Paginated result accumulator.
//!
//! Pages for one search term are requested strictly one after another and
//! appended in request order. Switching terms bumps the generation so that
//! results still in flight for the previous term are dropped on arrival.
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{Lookup, QueryCache};
use crate::model::{BatchEntry, BatchPage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub term: String,
    pub generation: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    LoadingFirst,
    Ready,
    FetchingNext,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Appended { page: u32, records: usize },
    Failed,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageMeta {
    page: u32,
    has_more: bool,
    total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Accumulation {
    pages: Vec<PageMeta>,
    records: Vec<BatchEntry>,
}

#[derive(Debug, Clone)]
pub struct Accumulator {
    page_size: u32,
    term: String,
    generation: u64,
    status: Status,
    acc: Accumulation,
    fetched_at: Option<Instant>,
    error: Option<String>,
    cache: QueryCache<Accumulation>,
}

impl Accumulator {
    pub fn new(page_size: u32, stale_after: Duration, evict_after: Duration) -> Self {
        Self {
            page_size,
            term: String::new(),
            generation: 0,
            status: Status::Idle,
            acc: Accumulation::default(),
            fetched_at: None,
            error: None,
            cache: QueryCache::new(stale_after, evict_after),
        }
    }

    /// Switch to `term`. The previous accumulation is parked in the cache and
    /// never mixed with the new one. Returns the page-1 request unless a fresh
    /// cached accumulation was restored.
    pub fn activate(&mut self, term: &str, now: Instant) -> Option<PageRequest> {
        self.park(now);
        self.generation += 1;
        self.term = term.to_string();
        self.acc = Accumulation::default();
        self.fetched_at = None;
        self.error = None;

        if let Lookup::Fresh(acc) = self.cache.lookup(term, now) {
            info!(term, pages = acc.pages.len(), "restored cached batches");
            self.fetched_at = self.cache.fetched_at(term);
            self.acc = acc;
            self.status = Status::Ready;
            return None;
        }

        self.status = Status::LoadingFirst;
        Some(self.request_for(1))
    }

    /// Drop everything including the cache, as on a full reload.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.term.clear();
        self.acc = Accumulation::default();
        self.fetched_at = None;
        self.error = None;
        self.status = Status::Idle;
        self.cache.clear();
    }

    /// Next page request, only once the previous page is known to have more.
    pub fn request_next(&mut self) -> Option<PageRequest> {
        if self.status != Status::Ready || !self.has_more() {
            return None;
        }
        let next = self.acc.pages.last().map(|p| p.page + 1)?;
        self.status = Status::FetchingNext;
        debug!(term = %self.term, page = next, "requesting next page");
        Some(self.request_for(next))
    }

    pub fn complete(
        &mut self,
        request: &PageRequest,
        result: Result<BatchPage, String>,
        now: Instant,
    ) -> Completion {
        if request.generation != self.generation
            || !matches!(self.status, Status::LoadingFirst | Status::FetchingNext)
        {
            debug!(
                page = request.page,
                generation = request.generation,
                current = self.generation,
                "discarding stale page result"
            );
            return Completion::Stale;
        }
        match result {
            Ok(page) => {
                self.fetched_at = Some(now);
                let records = page.batches.len();
                let number = page.page;
                self.acc.pages.push(PageMeta {
                    page: page.page,
                    has_more: page.has_more,
                    total: page.total,
                });
                self.acc.records.extend(page.batches);
                self.status = Status::Ready;
                info!(term = %self.term, page = number, records, has_more = page.has_more, "page appended");
                Completion::Appended { page: number, records }
            }
            Err(msg) => {
                warn!(term = %self.term, page = request.page, error = %msg, "page fetch failed");
                self.error = Some(msg);
                self.status = Status::Failed;
                Completion::Failed
            }
        }
    }

    fn park(&mut self, now: Instant) {
        if self.acc.pages.is_empty() || self.status == Status::Failed {
            return;
        }
        if let Some(fetched_at) = self.fetched_at {
            self.cache.insert(&self.term, self.acc.clone(), fetched_at, now);
        }
    }

    fn request_for(&self, page: u32) -> PageRequest {
        PageRequest {
            term: self.term.clone(),
            generation: self.generation,
            page,
            page_size: self.page_size,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn records(&self) -> &[BatchEntry] {
        &self.acc.records
    }

    pub fn pages_loaded(&self) -> usize {
        self.acc.pages.len()
    }

    pub fn has_more(&self) -> bool {
        self.acc.pages.last().is_some_and(|p| p.has_more)
    }

    /// Total as reported by the first page of the current term.
    pub fn total(&self) -> u64 {
        self.acc.pages.first().map(|p| p.total).unwrap_or(0)
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::LoadingFirst
    }

    pub fn is_fetching_next(&self) -> bool {
        self.status == Status::FetchingNext
    }

    pub fn is_fetching(&self) -> bool {
        self.is_loading() || self.is_fetching_next()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cached_terms(&self) -> usize {
        self.cache.len()
    }
}
