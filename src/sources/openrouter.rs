//! OpenRouter model catalog.
//!
//! Handles the `/api/v1/models` response and converts each entry into a
//! [`CatalogEntry`]. Prices arrive as decimal strings of cost per single
//! token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{info, warn};

use super::{CatalogSource, check_status, http_client, lenient};
use crate::Result;
use crate::cache::SourceCache;
use crate::types::{CatalogEntry, CatalogPricing};

pub(crate) const DEFAULT_BASE_URL: &str = "https://openrouter.ai";
pub(crate) const CACHE_KEY: &str = "openrouter_models";
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// OpenRouter `/api/v1/models` list response.
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

/// A single model entry from the OpenRouter API.
#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    context_length: Option<u64>,
    #[serde(default)]
    pricing: Option<WirePricing>,
    #[serde(default)]
    top_provider: Option<TopProvider>,
    #[serde(default)]
    architecture: Option<Architecture>,
}

#[derive(Debug, Deserialize)]
struct WirePricing {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    prompt: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    completion: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    image: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TopProvider {
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    max_completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Architecture {
    #[serde(default)]
    modality: Option<String>,
}

fn into_catalog_entry(entry: ModelEntry) -> CatalogEntry {
    let pricing = entry
        .pricing
        .map(|p| CatalogPricing {
            prompt_cost_per_token: p.prompt.unwrap_or(0.0),
            completion_cost_per_token: p.completion.unwrap_or(0.0),
            image_cost: p.image,
        })
        .unwrap_or_default();

    CatalogEntry {
        display_name: entry.name.unwrap_or_else(|| entry.id.clone()),
        id: entry.id,
        description: entry.description.filter(|d| !d.is_empty()),
        context_length: entry.context_length.unwrap_or(0),
        max_output_tokens: entry.top_provider.and_then(|tp| tp.max_completion_tokens),
        modality: entry.architecture.and_then(|a| a.modality),
        pricing,
    }
}

/// Decode an `/api/v1/models` body.
fn parse_models(body: &str) -> Result<Vec<CatalogEntry>> {
    let response: ModelsResponse = serde_json::from_str(body)?;
    Ok(response.data.into_iter().map(into_catalog_entry).collect())
}

/// Catalog adapter for the OpenRouter public model list.
#[derive(Clone)]
pub struct OpenRouterCatalog {
    http: Client,
    base_url: String,
    cache: Arc<SourceCache>,
    ttl: Duration,
}

impl OpenRouterCatalog {
    pub fn new(cache: Arc<SourceCache>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, cache)
    }

    /// Create an adapter against a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>, cache: Arc<SourceCache>) -> Result<Self> {
        Ok(Self {
            http: http_client(DEFAULT_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache,
            ttl: DEFAULT_TTL,
        })
    }

    /// How long a fetched catalog is served from cache. Default: 300 s.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Per-request HTTP timeout. Default: 15 s.
    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = http_client(timeout)?;
        Ok(self)
    }
}

#[async_trait]
impl CatalogSource for OpenRouterCatalog {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn fetch(&self) -> Result<Vec<CatalogEntry>> {
        if let Some(models) = self.cache.get::<Vec<CatalogEntry>>(CACHE_KEY)? {
            return Ok(models);
        }

        let url = format!("{}/api/v1/models", self.base_url);
        let start = Instant::now();
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        check_status(&response, "openrouter models")?;
        let body = response.text().await?;
        let models = parse_models(&body)?;

        if models.is_empty() {
            warn!(url = %url, "OpenRouter returned an empty model list");
            return Ok(models);
        }
        self.cache.set(CACHE_KEY, models.clone(), self.ttl);
        info!(
            count = models.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched OpenRouter catalog"
        );
        Ok(models)
    }
}
