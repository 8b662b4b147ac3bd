use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use batch_catalog::api::HttpCatalogClient;
use batch_catalog::catalog::{PageView, Settings, UiEvent};
use batch_catalog::config;
use batch_catalog::loader::SentinelBounds;
use batch_catalog::render::{render_page, DEFAULT_STYLE};
use batch_catalog::session::Session;

const VIEWPORT_HEIGHT: f64 = 900.0;
const HEADER_HEIGHT: f64 = 640.0;
const CARD_ROW_HEIGHT: f64 = 420.0;
const GRID_COLUMNS: usize = 3;
const SENTINEL_HEIGHT: f64 = 80.0;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Browse the batch catalog, scrolling through pages, and render it to static HTML"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Search term typed into the search box
    #[arg(long)]
    search: Option<String>,

    /// Stop scrolling once this many pages are loaded
    #[arg(long, default_value_t = 3)]
    max_pages: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let client = Arc::new(HttpCatalogClient::from_config(&cfg)?);
    let settings = Settings::from(&cfg.catalog);
    let mut handle = Session::spawn(client, &settings);

    let mut view = handle
        .wait_for(|v| v.error.is_some() || v.is_settled())
        .await?;

    if let Some(term) = args.search.as_deref() {
        info!(term, "typing search term");
        handle.events.send(UiEvent::Input(term.to_string())).await?;
        view = handle
            .wait_for(|v| v.error.is_some() || (v.active_term == term && v.is_settled()))
            .await?;
    }

    // the sentinel trails the filtered grid and is absent when it is empty
    while view.error.is_none()
        && view.has_more
        && !view.batches.is_empty()
        && view.pages_loaded < args.max_pages
    {
        let loaded = view.pages_loaded;
        let shown = view.batches.len();
        let top = sentinel_top(shown);
        handle
            .events
            .send(UiEvent::Sentinel(SentinelBounds::in_view(top, SENTINEL_HEIGHT, VIEWPORT_HEIGHT)))
            .await?;
        // scroll back up so the next page does not chain-load
        handle
            .events
            .send(UiEvent::Sentinel(SentinelBounds {
                viewport_top: 0.0,
                viewport_height: VIEWPORT_HEIGHT,
                sentinel_top: sentinel_top(shown + settings.page_size as usize),
                sentinel_height: SENTINEL_HEIGHT,
            }))
            .await?;
        view = handle
            .wait_for(|v| v.error.is_some() || (v.pages_loaded > loaded && v.is_settled()))
            .await?;
        info!(pages = view.pages_loaded, records = view.fetched, "scrolled");
    }

    let view = handle.finish().await.unwrap_or(view);
    write_page(&view, &cfg).await?;

    if let Some(err) = view.error.as_deref() {
        warn!(error = %err, "catalog rendered in error state");
        return Err(anyhow!("failed to load catalog: {}", err));
    }
    println!("{}", view.count_line());
    Ok(())
}

fn sentinel_top(cards: usize) -> f64 {
    let rows = cards.div_ceil(GRID_COLUMNS);
    HEADER_HEIGHT + rows as f64 * CARD_ROW_HEIGHT
}

async fn write_page(view: &PageView, cfg: &config::Config) -> Result<()> {
    let out_dir = PathBuf::from(&cfg.app.output_dir);
    let static_dir = out_dir.join("static");
    tokio::fs::create_dir_all(&static_dir)
        .await
        .with_context(|| format!("failed to create {}", static_dir.display()))?;

    let index_path = out_dir.join("index.html");
    tokio::fs::write(&index_path, render_page(view, &cfg.images))
        .await
        .with_context(|| format!("failed to write {}", index_path.display()))?;

    let css_path = static_dir.join("style.css");
    tokio::fs::write(&css_path, DEFAULT_STYLE)
        .await
        .with_context(|| format!("failed to write {}", css_path.display()))?;

    println!("Wrote {} and {}", index_path.display(), css_path.display());
    println!("Index full path: {}", absolute_path(&index_path).display());
    Ok(())
}

fn absolute_path(p: &Path) -> PathBuf {
    if p.is_absolute() {
        return p.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(p),
        Err(_) => p.to_path_buf(),
    }
}
