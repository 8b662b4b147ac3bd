use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::model::{BatchPage, PopularBatchEntry};

/// Remote source of catalog data.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn fetch_popular_batches(&self) -> Result<Vec<PopularBatchEntry>>;

    async fn fetch_batches_chunked(&self, page: u32, page_size: u32) -> Result<BatchPage>;
}

#[derive(Clone)]
pub struct HttpCatalogClient {
    http: Client,
    base_url: Url,
    popular_path: String,
    batches_path: String,
}

impl fmt::Debug for HttpCatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCatalogClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// The popular endpoint answers either with a bare list or wrapped in `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PopularResponse {
    Wrapped { data: Vec<PopularBatchEntry> },
    Bare(Vec<PopularBatchEntry>),
}

impl PopularResponse {
    fn into_entries(self) -> Vec<PopularBatchEntry> {
        match self {
            PopularResponse::Wrapped { data } => data,
            PopularResponse::Bare(entries) => entries,
        }
    }
}

impl HttpCatalogClient {
    pub fn new(base_url: Url, popular_path: String, batches_path: String) -> Self {
        let http = Client::builder()
            .user_agent("batch-catalog/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            popular_path,
            batches_path,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = cfg.base_url().context("invalid catalog API base URL")?;
        Ok(Self::new(
            base_url,
            cfg.api.popular_path.clone(),
            cfg.api.batches_path.clone(),
        ))
    }

    pub fn popular_url(&self) -> Result<Url> {
        self.base_url
            .join(&self.popular_path)
            .context("invalid popular batches path")
    }

    pub fn page_url(&self, page: u32, page_size: u32) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&self.batches_path)
            .context("invalid batches path")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &page_size.to_string());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        info!(url = %url, "catalog API request");
        let res = self
            .http
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("failed to reach catalog API at {}", url))?;

        let status = res.status();
        info!(%status, "catalog API response");
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by catalog API: {}", body);
            return Err(anyhow!("received 429 from catalog API: {}", body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, body = %body, "catalog API error");
            return Err(anyhow!("catalog API error {}: {}", status, body));
        }

        let body = res
            .text()
            .await
            .context("failed to read catalog API response")?;
        debug!("response body: {}", body);
        serde_json::from_str(&body).context("invalid catalog API response JSON")
    }
}

#[async_trait]
impl CatalogService for HttpCatalogClient {
    #[instrument(skip_all)]
    async fn fetch_popular_batches(&self) -> Result<Vec<PopularBatchEntry>> {
        let url = self.popular_url()?;
        let resp: PopularResponse = self.get_json(url).await?;
        let entries = resp.into_entries();
        info!(count = entries.len(), "fetched popular batches");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn fetch_batches_chunked(&self, page: u32, page_size: u32) -> Result<BatchPage> {
        let url = self.page_url(page, page_size)?;
        let chunk: BatchPage = self
            .get_json(url)
            .await
            .with_context(|| format!("failed to fetch batches page {}", page))?;
        info!(
            page = chunk.page,
            records = chunk.batches.len(),
            has_more = chunk.has_more,
            total = chunk.total,
            "fetched batches page"
        );
        Ok(chunk)
    }
}
