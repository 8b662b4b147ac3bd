//! Async driver for a `CatalogPage`.
//!
//! One task owns the page. It reacts to UI events, the debounce deadline and
//! finished fetches, and publishes a fresh `PageView` after each step. Fetches
//! run as spawned tasks reporting back over a channel; at most one page fetch
//! is alive at a time and it is aborted when a new term supersedes it.
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument};

use crate::api::CatalogService;
use crate::catalog::{CatalogPage, Fetch, PageView, Settings, UiEvent};
use crate::model::{BatchPage, PopularBatchEntry};
use crate::pagination::PageRequest;

const EVENT_BUFFER: usize = 64;

#[derive(Debug)]
enum FetchResult {
    Popular {
        generation: u64,
        result: Result<Vec<PopularBatchEntry>, String>,
    },
    Page {
        request: PageRequest,
        result: Result<BatchPage, String>,
    },
}

pub struct Session {
    page: CatalogPage,
    service: Arc<dyn CatalogService>,
    view_tx: watch::Sender<PageView>,
    page_task: Option<JoinHandle<()>>,
    popular_task: Option<JoinHandle<()>>,
}

/// Handle to a spawned session.
pub struct SessionHandle {
    pub events: mpsc::Sender<UiEvent>,
    pub view: watch::Receiver<PageView>,
    pub join: JoinHandle<PageView>,
}

impl SessionHandle {
    /// Wait until the published view satisfies `pred` and return a copy of it.
    pub async fn wait_for(&mut self, pred: impl FnMut(&PageView) -> bool) -> anyhow::Result<PageView> {
        let view = self.view.wait_for(pred).await?.clone();
        Ok(view)
    }

    /// Tear the page down and collect the last view.
    pub async fn finish(self) -> anyhow::Result<PageView> {
        // the session may already be gone; the join result is what matters
        let _ = self.events.send(UiEvent::Teardown).await;
        Ok(self.join.await?)
    }
}

impl Session {
    pub fn new(service: Arc<dyn CatalogService>, settings: &Settings) -> (Self, watch::Receiver<PageView>) {
        let page = CatalogPage::new(settings);
        let (view_tx, view_rx) = watch::channel(page.view());
        (
            Self {
                page,
                service,
                view_tx,
                page_task: None,
                popular_task: None,
            },
            view_rx,
        )
    }

    pub fn spawn(service: Arc<dyn CatalogService>, settings: &Settings) -> SessionHandle {
        let (session, view) = Self::new(service, settings);
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let join = tokio::spawn(session.run(rx));
        SessionHandle { events, view, join }
    }

    /// Drive the page until `Teardown` arrives or every event sender is dropped.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>) -> PageView {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let fetches = self.page.mount(Instant::now());
        self.dispatch(fetches, &results_tx);
        self.publish();

        loop {
            let deadline = self.page.deadline();
            let debounce = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;

                event = events.recv() => match event {
                    None | Some(UiEvent::Teardown) => break,
                    Some(event) => {
                        debug!(?event, "ui event");
                        let fetches = self.page.handle(event, Instant::now());
                        self.dispatch(fetches, &results_tx);
                    }
                },
                Some(done) = results_rx.recv() => {
                    let fetches = self.complete(done);
                    self.dispatch(fetches, &results_tx);
                }
                _ = debounce => {
                    let fetches = self.page.tick(Instant::now());
                    self.dispatch(fetches, &results_tx);
                }
            }
            self.publish();
        }

        self.teardown();
        let view = self.page.view();
        self.view_tx.send_replace(view.clone());
        info!("catalog session finished");
        view
    }

    fn complete(&mut self, done: FetchResult) -> Vec<Fetch> {
        match done {
            FetchResult::Popular { generation, result } => {
                self.page.popular_loaded(generation, result);
                Vec::new()
            }
            FetchResult::Page { request, result } => {
                self.page.page_loaded(&request, result, Instant::now())
            }
        }
    }

    fn dispatch(&mut self, fetches: Vec<Fetch>, results_tx: &mpsc::UnboundedSender<FetchResult>) {
        for fetch in fetches {
            let service = Arc::clone(&self.service);
            let tx = results_tx.clone();
            match fetch {
                Fetch::Popular { generation } => {
                    if let Some(task) = self.popular_task.take() {
                        task.abort();
                    }
                    self.popular_task = Some(tokio::spawn(async move {
                        let result = service
                            .fetch_popular_batches()
                            .await
                            .map_err(|e| format!("{:#}", e));
                        let _ = tx.send(FetchResult::Popular { generation, result });
                    }));
                }
                Fetch::Page(request) => {
                    if let Some(task) = self.page_task.take() {
                        task.abort();
                    }
                    debug!(page = request.page, term = %request.term, "dispatching page fetch");
                    self.page_task = Some(tokio::spawn(async move {
                        let result = service
                            .fetch_batches_chunked(request.page, request.page_size)
                            .await
                            .map_err(|e| format!("{:#}", e));
                        let _ = tx.send(FetchResult::Page { request, result });
                    }));
                }
            }
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.page.view());
    }

    fn teardown(&mut self) {
        self.page.teardown();
        for task in [self.page_task.take(), self.popular_task.take()].into_iter().flatten() {
            task.abort();
        }
    }
}
