use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use batch_catalog::api::{CatalogService, HttpCatalogClient};
use batch_catalog::config;
use batch_catalog::image::{batch_image_url, popular_image_url};
use batch_catalog::render::format_date;

#[derive(Parser, Debug)]
#[command(about = "Print popular batches and one page of all batches with their resolved images")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Page of the batch listing to inspect
    #[arg(long, default_value_t = 1)]
    page: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client = HttpCatalogClient::from_config(&cfg)?;

    let (popular, chunk) = futures::future::try_join(
        client.fetch_popular_batches(),
        client.fetch_batches_chunked(args.page, cfg.catalog.page_size),
    )
    .await?;

    println!("Popular batches: {}", popular.len());
    for entry in &popular {
        let info = &entry.type_info;
        println!(
            "  {} [{}] starts {} -> {}",
            info.name,
            entry.detail_id(),
            format_date(info.start_date.as_deref().unwrap_or_default()),
            popular_image_url(info, &cfg.images).unwrap_or_else(|| "(placeholder)".into())
        );
    }

    println!(
        "Page {} ({} records, has_more: {}, total: {})",
        chunk.page,
        chunk.batches.len(),
        chunk.has_more,
        chunk.total
    );
    for batch in &chunk.batches {
        println!(
            "  {} [{}] {} -> {}",
            batch.name,
            batch.id,
            batch.status.as_deref().unwrap_or("-"),
            batch_image_url(batch, &cfg.images)
        );
    }
    Ok(())
}
