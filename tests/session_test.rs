use anyhow::{anyhow, Result};
use batch_catalog::api::CatalogService;
use batch_catalog::catalog::{Footer, Settings, UiEvent};
use batch_catalog::config::Images;
use batch_catalog::loader::SentinelBounds;
use batch_catalog::model::{BatchEntry, BatchPage, PopularBatchEntry, TypeInfo};
use batch_catalog::render::render_page;
use batch_catalog::session::Session;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;

#[derive(Clone, Default)]
struct RecordingCatalog {
    pages: Arc<Mutex<VecDeque<Result<BatchPage>>>>,
    popular: Arc<Mutex<VecDeque<Result<Vec<PopularBatchEntry>>>>>,
    page_calls: Arc<Mutex<Vec<(u32, u32)>>>,
    popular_calls: Arc<Mutex<usize>>,
    page_delay: Option<Duration>,
}

impl RecordingCatalog {
    fn with_pages(pages: Vec<Result<BatchPage>>) -> Self {
        Self {
            pages: Arc::new(Mutex::new(VecDeque::from(pages))),
            ..Default::default()
        }
    }

    async fn page_calls(&self) -> Vec<u32> {
        self.page_calls.lock().await.iter().map(|(p, _)| *p).collect()
    }

    async fn popular_calls(&self) -> usize {
        *self.popular_calls.lock().await
    }
}

#[async_trait::async_trait]
impl CatalogService for RecordingCatalog {
    async fn fetch_popular_batches(&self) -> Result<Vec<PopularBatchEntry>> {
        *self.popular_calls.lock().await += 1;
        let mut guard = self.popular.lock().await;
        guard.pop_front().unwrap_or_else(|| Ok(vec![]))
    }

    async fn fetch_batches_chunked(&self, page: u32, page_size: u32) -> Result<BatchPage> {
        self.page_calls.lock().await.push((page, page_size));
        let next = self.pages.lock().await.pop_front();
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        next.unwrap_or_else(|| {
            Ok(BatchPage {
                page,
                ..Default::default()
            })
        })
    }
}

fn batch(id: String, name: &str) -> BatchEntry {
    BatchEntry {
        id,
        name: name.to_string(),
        class: None,
        exam: vec![],
        start_date: None,
        status: Some("Active".into()),
        preview_image: None,
        image: None,
    }
}

fn chunk(page: u32, count: usize, has_more: bool, total: u64) -> BatchPage {
    BatchPage {
        batches: (0..count)
            .map(|i| batch(format!("{}-{}", page, i), &format!("Batch {}", i)))
            .collect(),
        has_more,
        page,
        total,
    }
}

fn sentinel_visible() -> SentinelBounds {
    SentinelBounds::in_view(5000.0, 80.0, 900.0)
}

fn sentinel_hidden() -> SentinelBounds {
    SentinelBounds {
        viewport_top: 0.0,
        viewport_height: 900.0,
        sentinel_top: 5000.0,
        sentinel_height: 80.0,
    }
}

#[tokio::test]
async fn scrolling_sentinel_into_view_loads_exactly_one_more_page() {
    let service = RecordingCatalog::with_pages(vec![
        Ok(chunk(1, 16, true, 32)),
        Ok(chunk(2, 16, false, 32)),
    ]);
    service.popular.lock().await.push_back(Ok(vec![PopularBatchEntry {
        type_id: "t-1".into(),
        type_info: TypeInfo {
            name: "Yakeen NEET 2025".into(),
            ..Default::default()
        },
    }]));

    let mut handle = Session::spawn(Arc::new(service.clone()), &Settings::default());
    let view = handle
        .wait_for(|v| v.fetched == 16 && v.is_settled())
        .await
        .unwrap();
    assert!(view.has_more);
    assert_eq!(view.popular.len(), 1);
    assert_eq!(view.footer(), Footer::None);

    handle.events.send(UiEvent::Sentinel(sentinel_visible())).await.unwrap();
    let view = handle
        .wait_for(|v| v.pages_loaded == 2 && v.is_settled())
        .await
        .unwrap();
    assert_eq!(view.batches.len(), 32);
    assert_eq!(view.footer(), Footer::End { shown: 32 });

    let view = handle.finish().await.unwrap();
    assert_eq!(service.page_calls().await, vec![1, 2]);
    assert_eq!(service.page_calls.lock().await[0].1, 16);

    let html = render_page(&view, &Images::default());
    assert!(html.contains("Popular Batches"));
    assert!(html.contains("Yakeen NEET 2025"));
    assert!(html.contains("Showing 32 of 32 batches"));
}

#[tokio::test]
async fn single_page_shows_end_marker_and_never_requests_more() {
    let service = RecordingCatalog::with_pages(vec![Ok(chunk(1, 5, false, 5))]);
    let mut handle = Session::spawn(Arc::new(service.clone()), &Settings::default());

    let view = handle.wait_for(|v| v.is_settled() && v.fetched == 5).await.unwrap();
    assert_eq!(view.footer(), Footer::End { shown: 5 });

    for _ in 0..3 {
        handle.events.send(UiEvent::Sentinel(sentinel_visible())).await.unwrap();
        handle.events.send(UiEvent::Sentinel(sentinel_hidden())).await.unwrap();
    }
    let view = handle.finish().await.unwrap();
    assert_eq!(view.pages_loaded, 1);
    assert_eq!(service.page_calls().await, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn rapid_typing_applies_only_the_final_term() {
    let mut first = chunk(1, 0, false, 2);
    first.batches = vec![
        batch("a".into(), "Physics NEET"),
        batch("b".into(), "Chemistry JEE"),
    ];
    let second = first.clone();
    let service = RecordingCatalog::with_pages(vec![Ok(first), Ok(second)]);
    let mut handle = Session::spawn(Arc::new(service.clone()), &Settings::default());
    handle.wait_for(|v| v.is_settled() && v.fetched == 2).await.unwrap();

    for raw in ["j", "je", "jee"] {
        handle.events.send(UiEvent::Input(raw.into())).await.unwrap();
    }
    let view = handle
        .wait_for(|v| v.active_term == "jee" && v.is_settled())
        .await
        .unwrap();
    assert_eq!(view.raw_term, "jee");
    assert_eq!(view.batches.len(), 1);
    assert_eq!(view.batches[0].name, "Chemistry JEE");

    handle.finish().await.unwrap();
    // initial load plus exactly one restart for the debounced term
    assert_eq!(service.page_calls().await, vec![1, 1]);
}

#[tokio::test(start_paused = true)]
async fn term_change_during_load_drops_stale_page() {
    let mut fresh = chunk(1, 0, false, 1);
    fresh.batches = vec![batch("n".into(), "Arjuna NEET")];
    let mut service = RecordingCatalog::with_pages(vec![Ok(chunk(1, 16, true, 64)), Ok(fresh)]);
    service.page_delay = Some(Duration::from_secs(1));

    let mut handle = Session::spawn(Arc::new(service.clone()), &Settings::default());
    handle.events.send(UiEvent::Input("neet".into())).await.unwrap();

    let view = handle
        .wait_for(|v| v.active_term == "neet" && v.is_settled())
        .await
        .unwrap();
    assert_eq!(view.fetched, 1);
    assert_eq!(view.total, 1);
    assert_eq!(view.batches[0].id, "n");

    handle.finish().await.unwrap();
    assert_eq!(service.page_calls().await, vec![1, 1]);
}

#[tokio::test]
async fn fetch_failure_shows_error_until_reload() {
    let service = RecordingCatalog::with_pages(vec![
        Err(anyhow!("catalog API error 503")),
        Ok(chunk(1, 3, false, 3)),
    ]);
    let mut handle = Session::spawn(Arc::new(service.clone()), &Settings::default());

    let view = handle.wait_for(|v| v.error.is_some()).await.unwrap();
    assert!(view.error.as_deref().unwrap().contains("503"));
    let html = render_page(&view, &Images::default());
    assert!(html.contains("Try again"));

    handle.events.send(UiEvent::Reload).await.unwrap();
    let view = handle
        .wait_for(|v| v.error.is_none() && v.is_settled() && v.fetched == 3)
        .await
        .unwrap();
    assert_eq!(view.count_line(), "Showing 3 of 3 batches");

    handle.finish().await.unwrap();
    assert_eq!(service.popular_calls().await, 2);
}

#[tokio::test(start_paused = true)]
async fn teardown_with_page_in_flight_drops_the_late_result() {
    let mut service = RecordingCatalog::with_pages(vec![Ok(chunk(1, 16, true, 64))]);
    service.page_delay = Some(Duration::from_secs(5));

    let mut handle = Session::spawn(Arc::new(service.clone()), &Settings::default());
    handle.wait_for(|v| v.mounted && v.all_loading).await.unwrap();
    // let the fetch task start and park inside its delay
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(service.page_calls().await, vec![1]);

    let view = handle.finish().await.unwrap();
    assert!(!view.mounted);
    assert_eq!(view.fetched, 0);
    assert_eq!(view.pages_loaded, 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(service.page_calls().await, vec![1]);
}
