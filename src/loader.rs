//! Visibility-triggered loading of the next page.
//!
//! A sentinel sits after the rendered list and only exists while that list
//! has cards. An observer is connected only while the sentinel exists, more
//! pages exist and nothing is in flight; it is torn down and
//! re-created whenever those dependencies change. A freshly connected
//! observer reports the sentinel's current state straight away, then only
//! reports crossings of the visibility threshold.
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    /// Minimum visible fraction of the sentinel.
    pub threshold: f64,
    /// Pixels the viewport is grown by on each edge.
    pub root_margin_px: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin_px: 200.0,
        }
    }
}

/// Vertical geometry of the viewport and the sentinel, in page pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelBounds {
    pub viewport_top: f64,
    pub viewport_height: f64,
    pub sentinel_top: f64,
    pub sentinel_height: f64,
}

impl SentinelBounds {
    /// Viewport scrolled so that the sentinel sits fully inside it.
    pub fn in_view(sentinel_top: f64, sentinel_height: f64, viewport_height: f64) -> Self {
        Self {
            viewport_top: (sentinel_top + sentinel_height - viewport_height).max(0.0),
            viewport_height,
            sentinel_top,
            sentinel_height,
        }
    }

    pub fn intersection_ratio(&self, root_margin_px: f64) -> f64 {
        let root_start = self.viewport_top - root_margin_px;
        let root_end = self.viewport_top + self.viewport_height + root_margin_px;
        let target_start = self.sentinel_top;
        let target_end = self.sentinel_top + self.sentinel_height;

        if self.sentinel_height <= 0.0 {
            return if target_start >= root_start && target_start <= root_end { 1.0 } else { 0.0 };
        }
        let overlap = (target_end.min(root_end) - target_start.max(root_start)).max(0.0);
        overlap / self.sentinel_height
    }

    pub fn is_visible(&self, options: &ObserverOptions) -> bool {
        let ratio = self.intersection_ratio(options.root_margin_px);
        ratio > 0.0 && ratio >= options.threshold
    }
}

/// Inputs the observer is rebuilt on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderDeps {
    pub has_more: bool,
    pub fetching: bool,
    /// Changes whenever the query behind the fetch callback changes.
    pub generation: u64,
    /// Whether the sentinel element is on the page at all.
    pub sentinel_rendered: bool,
}

impl LoaderDeps {
    fn armed(&self) -> bool {
        self.sentinel_rendered && self.has_more && !self.fetching
    }
}

#[derive(Debug, Clone, Copy)]
struct Observer {
    id: u64,
    was_visible: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ViewportLoader {
    options: ObserverOptions,
    deps: Option<LoaderDeps>,
    observer: Option<Observer>,
    last_bounds: Option<SentinelBounds>,
    next_id: u64,
    connects: u64,
    disconnects: u64,
}

impl ViewportLoader {
    pub fn new(options: ObserverOptions) -> Self {
        Self {
            options,
            deps: None,
            observer: None,
            last_bounds: None,
            next_id: 1,
            connects: 0,
            disconnects: 0,
        }
    }

    /// Rebuild the observer if `deps` changed. Returns true when the new
    /// observer's initial report says the next page should be requested.
    pub fn sync(&mut self, deps: LoaderDeps) -> bool {
        if self.deps == Some(deps) {
            return false;
        }
        self.disconnect();
        // geometry seen under another query or a sentinel that has since
        // been removed says nothing about the sentinel that comes next
        if !deps.sentinel_rendered
            || self.deps.is_some_and(|d| d.generation != deps.generation)
        {
            self.last_bounds = None;
        }
        self.deps = Some(deps);
        if !deps.armed() {
            return false;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.connects += 1;
        self.observer = Some(Observer { id, was_visible: None });
        debug!(observer = id, generation = deps.generation, "sentinel observer connected");

        match self.last_bounds {
            Some(bounds) => self.report(bounds),
            None => false,
        }
    }

    /// Feed the sentinel's current geometry. Returns true exactly once per
    /// transition into visibility while armed. Ignored while no sentinel is
    /// rendered.
    pub fn observe(&mut self, bounds: SentinelBounds) -> bool {
        if !self.deps.is_some_and(|d| d.sentinel_rendered) {
            return false;
        }
        self.last_bounds = Some(bounds);
        self.report(bounds)
    }

    fn report(&mut self, bounds: SentinelBounds) -> bool {
        let armed = self.deps.is_some_and(|d| d.armed());
        let visible = bounds.is_visible(&self.options);
        let Some(observer) = self.observer.as_mut() else {
            return false;
        };
        let entered = visible && observer.was_visible != Some(true);
        observer.was_visible = Some(visible);
        if entered && armed {
            debug!(observer = observer.id, "sentinel entered viewport");
            return true;
        }
        false
    }

    fn disconnect(&mut self) {
        if let Some(observer) = self.observer.take() {
            self.disconnects += 1;
            debug!(observer = observer.id, "sentinel observer disconnected");
        }
    }

    pub fn teardown(&mut self) {
        self.disconnect();
        self.deps = None;
        self.last_bounds = None;
    }

    pub fn is_connected(&self) -> bool {
        self.observer.is_some()
    }

    pub fn connects(&self) -> u64 {
        self.connects
    }

    pub fn disconnects(&self) -> u64 {
        self.disconnects
    }
}
