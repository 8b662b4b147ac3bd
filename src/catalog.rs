//! Page controller tying the debouncer, accumulator and loader together.
//!
//! The controller performs no I/O. Every operation returns the fetches the
//! caller must start; results are fed back through `page_loaded` and
//! `popular_loaded`.
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config;
use crate::debounce::Debouncer;
use crate::filter::filter_batches;
use crate::loader::{LoaderDeps, ObserverOptions, SentinelBounds, ViewportLoader};
use crate::model::{BatchEntry, BatchPage, PopularBatchEntry};
use crate::pagination::{Accumulator, PageRequest};

pub const GENERIC_ERROR: &str = "Something went wrong while fetching batches.";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub page_size: u32,
    pub debounce: Duration,
    pub stale_after: Duration,
    pub evict_after: Duration,
    pub observer: ObserverOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&config::Catalog::default())
    }
}

impl From<&config::Catalog> for Settings {
    fn from(c: &config::Catalog) -> Self {
        Self {
            page_size: c.page_size,
            debounce: c.debounce(),
            stale_after: c.stale_after(),
            evict_after: c.evict_after(),
            observer: ObserverOptions {
                threshold: c.threshold,
                root_margin_px: c.root_margin_px,
            },
        }
    }
}

/// Things the user (or a driver standing in for one) does to the page.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Input(String),
    ClearSearch,
    Sentinel(SentinelBounds),
    Reload,
    Teardown,
}

/// A fetch the caller must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    Popular { generation: u64 },
    Page(PageRequest),
}

#[derive(Debug, Clone, Default)]
struct PopularState {
    entries: Vec<PopularBatchEntry>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    None,
    LoadingMore,
    End { shown: usize },
}

/// Snapshot of everything the page renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageView {
    pub mounted: bool,
    pub raw_term: String,
    pub active_term: String,
    pub popular: Vec<PopularBatchEntry>,
    pub popular_loading: bool,
    /// Fetched records after the client-side term filter.
    pub batches: Vec<BatchEntry>,
    /// Records fetched so far, before filtering.
    pub fetched: usize,
    pub total: u64,
    pub loading: bool,
    pub all_loading: bool,
    pub fetching_next: bool,
    pub has_more: bool,
    pub pages_loaded: usize,
    pub error: Option<String>,
}

impl PageView {
    pub fn count_line(&self) -> String {
        if self.loading {
            "Loading batches...".to_string()
        } else {
            format!("Showing {} of {} batches", self.batches.len(), self.total)
        }
    }

    pub fn footer(&self) -> Footer {
        if self.fetching_next {
            Footer::LoadingMore
        } else if !self.has_more && !self.batches.is_empty() {
            Footer::End { shown: self.batches.len() }
        } else {
            Footer::None
        }
    }

    /// Mounted with no fetch in flight.
    pub fn is_settled(&self) -> bool {
        self.mounted && !self.loading && !self.fetching_next
    }
}

#[derive(Debug, Clone)]
pub struct CatalogPage {
    debouncer: Debouncer,
    accumulator: Accumulator,
    loader: ViewportLoader,
    popular: PopularState,
    mounted: bool,
}

impl CatalogPage {
    pub fn new(settings: &Settings) -> Self {
        Self {
            debouncer: Debouncer::new(settings.debounce),
            accumulator: Accumulator::new(settings.page_size, settings.stale_after, settings.evict_after),
            loader: ViewportLoader::new(settings.observer),
            popular: PopularState::default(),
            mounted: false,
        }
    }

    /// Start both queries.
    pub fn mount(&mut self, now: Instant) -> Vec<Fetch> {
        self.mounted = true;
        self.popular.loading = true;
        self.popular.error = None;
        self.popular.generation += 1;
        let mut out = vec![Fetch::Popular {
            generation: self.popular.generation,
        }];
        let term = self.debouncer.active().to_string();
        if let Some(req) = self.accumulator.activate(&term, now) {
            out.push(Fetch::Page(req));
        }
        self.sync_loader(&mut out);
        info!(term = %term, "catalog page mounted");
        out
    }

    pub fn handle(&mut self, event: UiEvent, now: Instant) -> Vec<Fetch> {
        if !self.mounted {
            return Vec::new();
        }
        match event {
            UiEvent::Input(raw) => {
                self.debouncer.input(raw, now);
                Vec::new()
            }
            UiEvent::ClearSearch => {
                self.debouncer.input("", now);
                Vec::new()
            }
            UiEvent::Sentinel(bounds) => self.sentinel(bounds),
            UiEvent::Reload => self.reload(now),
            UiEvent::Teardown => {
                self.teardown();
                Vec::new()
            }
        }
    }

    /// When the debouncer next needs a `tick`.
    pub fn deadline(&self) -> Option<Instant> {
        if self.mounted {
            self.debouncer.deadline()
        } else {
            None
        }
    }

    pub fn tick(&mut self, now: Instant) -> Vec<Fetch> {
        let mut out = Vec::new();
        if !self.mounted {
            return out;
        }
        if let Some(term) = self.debouncer.poll(now) {
            info!(term = %term, "search term changed");
            if let Some(req) = self.accumulator.activate(&term, now) {
                out.push(Fetch::Page(req));
            }
        }
        self.sync_loader(&mut out);
        out
    }

    fn sentinel(&mut self, bounds: SentinelBounds) -> Vec<Fetch> {
        let mut out = Vec::new();
        if self.loader.observe(bounds) {
            if let Some(req) = self.accumulator.request_next() {
                out.push(Fetch::Page(req));
            }
        }
        self.sync_loader(&mut out);
        out
    }

    pub fn page_loaded(
        &mut self,
        request: &PageRequest,
        result: Result<BatchPage, String>,
        now: Instant,
    ) -> Vec<Fetch> {
        let mut out = Vec::new();
        if !self.mounted {
            return out;
        }
        self.accumulator.complete(request, result, now);
        self.sync_loader(&mut out);
        out
    }

    pub fn popular_loaded(&mut self, generation: u64, result: Result<Vec<PopularBatchEntry>, String>) {
        if !self.mounted || generation != self.popular.generation {
            debug!(generation, "discarding stale popular batches");
            return;
        }
        self.popular.loading = false;
        match result {
            Ok(entries) => self.popular.entries = entries,
            Err(msg) => self.popular.error = Some(msg),
        }
    }

    /// Full reload: search, cache and both queries start over.
    pub fn reload(&mut self, now: Instant) -> Vec<Fetch> {
        info!("reloading catalog page");
        self.debouncer.reset();
        self.accumulator.reset();
        self.loader.teardown();
        self.popular.entries.clear();
        self.mount(now)
    }

    /// Cancel the pending debounce and disconnect the observer.
    pub fn teardown(&mut self) {
        self.debouncer.cancel();
        self.loader.teardown();
        self.mounted = false;
        debug!("catalog page torn down");
    }

    /// Re-evaluate the observer; a fresh observer may immediately ask for
    /// the next page if the sentinel is already on screen.
    fn sync_loader(&mut self, out: &mut Vec<Fetch>) {
        loop {
            let deps = LoaderDeps {
                has_more: self.accumulator.has_more(),
                fetching: self.accumulator.is_fetching(),
                generation: self.accumulator.generation(),
                sentinel_rendered: self.sentinel_rendered(),
            };
            if !self.loader.sync(deps) {
                return;
            }
            match self.accumulator.request_next() {
                Some(req) => out.push(Fetch::Page(req)),
                None => return,
            }
        }
    }

    /// The sentinel follows the card grid, which is absent while the first
    /// page loads and when nothing matches the active term.
    fn sentinel_rendered(&self) -> bool {
        !self.accumulator.is_loading()
            && !filter_batches(self.accumulator.records(), self.debouncer.active()).is_empty()
    }

    pub fn error(&self) -> Option<&str> {
        self.popular
            .error
            .as_deref()
            .or_else(|| self.accumulator.error())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn loader(&self) -> &ViewportLoader {
        &self.loader
    }

    pub fn view(&self) -> PageView {
        let active = self.debouncer.active();
        let records = self.accumulator.records();
        let batches = filter_batches(records, active)
            .into_iter()
            .cloned()
            .collect();
        let error = self.error().map(|e| {
            if e.trim().is_empty() {
                GENERIC_ERROR.to_string()
            } else {
                e.to_string()
            }
        });
        PageView {
            mounted: self.mounted,
            raw_term: self.debouncer.raw().to_string(),
            active_term: active.to_string(),
            popular: self.popular.entries.clone(),
            popular_loading: self.popular.loading,
            batches,
            fetched: records.len(),
            total: self.accumulator.total(),
            loading: self.popular.loading || self.accumulator.is_loading(),
            all_loading: self.accumulator.is_loading(),
            fetching_next: self.accumulator.is_fetching_next(),
            has_more: self.accumulator.has_more(),
            pages_loaded: self.accumulator.pages_loaded(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(page: u32, names: &[&str]) -> Vec<BatchEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| BatchEntry {
                id: format!("{}-{}", page, i),
                name: n.to_string(),
                class: None,
                exam: vec![],
                start_date: None,
                status: None,
                preview_image: None,
                image: None,
            })
            .collect()
    }

    fn chunk(page: u32, count: usize, has_more: bool, total: u64) -> BatchPage {
        let names: Vec<String> = (0..count).map(|i| format!("Batch {}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        BatchPage { batches: records(page, &names), has_more, page, total }
    }

    fn page_req(fetches: &[Fetch]) -> PageRequest {
        fetches
            .iter()
            .find_map(|f| match f {
                Fetch::Page(r) => Some(r.clone()),
                _ => None,
            })
            .expect("page fetch")
    }

    fn popular_gen(fetches: &[Fetch]) -> u64 {
        fetches
            .iter()
            .find_map(|f| match f {
                Fetch::Popular { generation } => Some(*generation),
                _ => None,
            })
            .expect("popular fetch")
    }

    fn visible() -> SentinelBounds {
        SentinelBounds::in_view(3000.0, 40.0, 800.0)
    }

    fn hidden() -> SentinelBounds {
        SentinelBounds { viewport_top: 0.0, viewport_height: 800.0, sentinel_top: 3000.0, sentinel_height: 40.0 }
    }

    fn mounted() -> (CatalogPage, Instant, PageRequest) {
        let now = Instant::now();
        let mut page = CatalogPage::new(&Settings::default());
        let fetches = page.mount(now);
        page.popular_loaded(popular_gen(&fetches), Ok(vec![]));
        (page, now, page_req(&fetches))
    }

    #[test]
    fn mount_requests_popular_and_first_page() {
        let now = Instant::now();
        let mut page = CatalogPage::new(&Settings::default());
        let fetches = page.mount(now);
        assert_eq!(fetches.len(), 2);
        assert_eq!(page_req(&fetches).page, 1);
        assert_eq!(page_req(&fetches).page_size, 16);
        let view = page.view();
        assert!(view.loading);
        assert_eq!(view.count_line(), "Loading batches...");
    }

    #[test]
    fn scroll_appends_second_page() {
        let (mut page, now, r1) = mounted();
        assert!(page.page_loaded(&r1, Ok(chunk(1, 16, true, 40)), now).is_empty());
        assert!(page.handle(UiEvent::Sentinel(hidden()), now).is_empty());

        let fetches = page.handle(UiEvent::Sentinel(visible()), now);
        assert_eq!(fetches.len(), 1);
        let r2 = page_req(&fetches);
        assert_eq!(r2.page, 2);
        assert_eq!(page.view().footer(), Footer::LoadingMore);

        // further visibility reports while page 2 is pending do nothing
        assert!(page.handle(UiEvent::Sentinel(visible()), now).is_empty());
        assert!(page.handle(UiEvent::Sentinel(hidden()), now).is_empty());

        assert!(page.page_loaded(&r2, Ok(chunk(2, 16, true, 40)), now).is_empty());
        let view = page.view();
        assert_eq!(view.batches.len(), 32);
        assert_eq!(view.count_line(), "Showing 32 of 40 batches");
    }

    #[test]
    fn sentinel_still_visible_after_load_requests_again() {
        let (mut page, now, r1) = mounted();
        page.page_loaded(&r1, Ok(chunk(1, 16, true, 48)), now);
        let r2 = page_req(&page.handle(UiEvent::Sentinel(visible()), now));
        let fetches = page.page_loaded(&r2, Ok(chunk(2, 16, true, 48)), now);
        assert_eq!(page_req(&fetches).page, 3);
    }

    #[test]
    fn end_of_list_is_terminal() {
        let (mut page, now, r1) = mounted();
        page.page_loaded(&r1, Ok(chunk(1, 7, false, 7)), now);
        assert_eq!(page.view().footer(), Footer::End { shown: 7 });
        for _ in 0..3 {
            assert!(page.handle(UiEvent::Sentinel(visible()), now).is_empty());
            assert!(page.handle(UiEvent::Sentinel(hidden()), now).is_empty());
        }
        assert!(!page.loader().is_connected());
    }

    #[test]
    fn debounced_term_filters_and_restarts_pagination() {
        let (mut page, now, r1) = mounted();
        let mut first = chunk(1, 0, true, 2);
        first.batches = records(1, &["Physics NEET", "Chemistry JEE"]);
        page.page_loaded(&r1, Ok(first), now);

        page.handle(UiEvent::Input("j".into()), now);
        page.handle(UiEvent::Input("JEE".into()), now + Duration::from_millis(200));
        assert!(page.tick(now + Duration::from_millis(600)).is_empty());
        assert_eq!(page.view().raw_term, "JEE");
        assert_eq!(page.view().active_term, "");

        let fetches = page.tick(now + Duration::from_millis(700));
        let r = page_req(&fetches);
        assert_eq!((r.page, r.term.as_str()), (1, "JEE"));
        assert!(page.view().batches.is_empty(), "old pages are not shown for the new term");

        let mut again = chunk(1, 0, false, 2);
        again.batches = records(1, &["Physics NEET", "Chemistry JEE"]);
        page.page_loaded(&r, Ok(again), now + Duration::from_millis(800));
        let view = page.view();
        assert_eq!(view.batches.len(), 1);
        assert_eq!(view.batches[0].name, "Chemistry JEE");
        assert_eq!(view.count_line(), "Showing 1 of 2 batches");
    }

    #[test]
    fn unmatched_term_does_not_page_without_a_sentinel() {
        let (mut page, now, r1) = mounted();
        page.page_loaded(&r1, Ok(chunk(1, 16, true, 160)), now);
        let r2 = page_req(&page.handle(UiEvent::Sentinel(visible()), now));
        page.handle(UiEvent::Sentinel(hidden()), now);
        assert!(page.page_loaded(&r2, Ok(chunk(2, 16, true, 160)), now).is_empty());
        let r3 = page_req(&page.handle(UiEvent::Sentinel(visible()), now));
        assert_eq!(r3.page, 3);

        page.handle(UiEvent::Input("zzz".into()), now);
        let later = now + Duration::from_millis(600);
        let r = page_req(&page.tick(later));
        assert_eq!((r.page, r.term.as_str()), (1, "zzz"));
        assert!(page.page_loaded(&r3, Ok(chunk(3, 16, true, 160)), later).is_empty());

        // nothing matches, so no grid and no sentinel to scroll to
        assert!(page.page_loaded(&r, Ok(chunk(1, 16, true, 160)), later).is_empty());
        assert!(page.view().batches.is_empty());
        assert!(!page.loader().is_connected());
        assert!(page.handle(UiEvent::Sentinel(visible()), later).is_empty());
        assert_eq!(page.view().pages_loaded, 1);

        // a matching term renders a sentinel but needs a fresh sighting of it
        page.handle(UiEvent::Input("batch".into()), later);
        let r = page_req(&page.tick(later + Duration::from_millis(600)));
        assert!(page.page_loaded(&r, Ok(chunk(1, 16, true, 160)), later).is_empty());
        assert!(page.loader().is_connected());
        let next = page_req(&page.handle(UiEvent::Sentinel(visible()), later));
        assert_eq!((next.page, next.term.as_str()), (2, "batch"));
    }

    #[test]
    fn page_failure_surfaces_error_and_reload_recovers() {
        let (mut page, now, r1) = mounted();
        page.page_loaded(&r1, Err("catalog API error 500".into()), now);
        assert_eq!(page.view().error.as_deref(), Some("catalog API error 500"));

        let fetches = page.handle(UiEvent::Reload, now);
        assert_eq!(fetches.len(), 2);
        let view = page.view();
        assert!(view.error.is_none());
        assert!(view.loading);
        assert_eq!(view.raw_term, "");
    }

    #[test]
    fn empty_error_message_uses_generic_text() {
        let now = Instant::now();
        let mut page = CatalogPage::new(&Settings::default());
        let fetches = page.mount(now);
        page.popular_loaded(popular_gen(&fetches), Err(String::new()));
        assert_eq!(page.view().error.as_deref(), Some(GENERIC_ERROR));
    }

    #[test]
    fn teardown_stops_pending_debounce() {
        let (mut page, now, _) = mounted();
        page.handle(UiEvent::Input("neet".into()), now);
        page.handle(UiEvent::Teardown, now);
        assert_eq!(page.deadline(), None);
        assert!(page.tick(now + Duration::from_secs(1)).is_empty());
        assert_eq!(page.view().active_term, "");
        assert_eq!(page.loader().connects(), page.loader().disconnects());
    }
}
