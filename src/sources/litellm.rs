//! LiteLLM community pricing table.
//!
//! `model_prices_and_context_window.json` is one JSON object keyed by model
//! id. Rows are decoded one at a time so a single malformed row does not
//! cost the whole table.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{PricingSource, check_status, http_client, lenient};
use crate::cache::SourceCache;
use crate::types::{CapabilityFlags, PricingEntry};
use crate::{MimirError, Result};

pub(crate) const DEFAULT_URL: &str =
    "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json";
pub(crate) const CACHE_KEY: &str = "litellm_pricing";
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(1800);
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Documentation row shipped at the top of the table.
const SAMPLE_SPEC_KEY: &str = "sample_spec";

#[derive(Debug, Deserialize)]
struct WireEntry {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    input_cost_per_token: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    output_cost_per_token: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    cache_read_input_token_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    max_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    max_input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    max_output_tokens: Option<u64>,
    #[serde(default)]
    litellm_provider: Option<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    supports_vision: Option<bool>,
    #[serde(default)]
    supports_function_calling: Option<bool>,
    #[serde(default)]
    supports_reasoning: Option<bool>,
    #[serde(default)]
    supports_prompt_caching: Option<bool>,
}

impl From<WireEntry> for PricingEntry {
    fn from(w: WireEntry) -> Self {
        Self {
            input_cost_per_token: w.input_cost_per_token,
            output_cost_per_token: w.output_cost_per_token,
            cache_read_cost_per_token: w.cache_read_input_token_cost,
            max_tokens: w.max_tokens,
            max_input_tokens: w.max_input_tokens,
            max_output_tokens: w.max_output_tokens,
            provider: w.litellm_provider,
            mode: w.mode,
            capabilities: CapabilityFlags {
                vision: w.supports_vision.unwrap_or(false),
                function_calling: w.supports_function_calling.unwrap_or(false),
                reasoning: w.supports_reasoning.unwrap_or(false),
                prompt_caching: w.supports_prompt_caching.unwrap_or(false),
            },
        }
    }
}

/// Decode the pricing table, skipping rows that do not fit the schema.
fn parse_table(body: &str) -> Result<BTreeMap<String, PricingEntry>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let serde_json::Value::Object(rows) = value else {
        return Err(MimirError::Parse(
            "pricing table is not a JSON object".to_string(),
        ));
    };

    let mut table = BTreeMap::new();
    for (id, row) in rows {
        if id == SAMPLE_SPEC_KEY {
            continue;
        }
        match serde_json::from_value::<WireEntry>(row) {
            Ok(entry) => {
                table.insert(id, entry.into());
            }
            Err(e) => debug!(id = %id, error = %e, "skipping malformed pricing row"),
        }
    }
    Ok(table)
}

/// Pricing adapter for the LiteLLM pricing JSON.
#[derive(Clone)]
pub struct LiteLlmPricing {
    http: Client,
    url: String,
    cache: Arc<SourceCache>,
    ttl: Duration,
}

impl LiteLlmPricing {
    pub fn new(cache: Arc<SourceCache>) -> Result<Self> {
        Self::with_url(DEFAULT_URL, cache)
    }

    /// Create an adapter fetching from a custom URL (for testing with wiremock).
    pub fn with_url(url: impl Into<String>, cache: Arc<SourceCache>) -> Result<Self> {
        Ok(Self {
            http: http_client(DEFAULT_TIMEOUT)?,
            url: url.into(),
            cache,
            ttl: DEFAULT_TTL,
        })
    }

    /// How long a fetched table is served from cache. Default: 1800 s.
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
impl PricingSource for LiteLlmPricing {
    fn name(&self) -> &str {
        "litellm"
    }

    async fn fetch(&self) -> Result<BTreeMap<String, PricingEntry>> {
        if let Some(table) = self.cache.get::<BTreeMap<String, PricingEntry>>(CACHE_KEY)? {
            return Ok(table);
        }

        let response = self.http.get(&self.url).send().await?;
        check_status(&response, "litellm pricing")?;
        let body = response.text().await?;
        let table = parse_table(&body)?;

        if !table.is_empty() {
            self.cache.set(CACHE_KEY, table.clone(), self.ttl);
        }
        info!(count = table.len(), "fetched LiteLLM pricing table");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rows_and_drops_sample_spec() {
        let body = r#"{
            "sample_spec": {"max_tokens": "set to max_output_tokens", "input_cost_per_token": 0.0},
            "gpt-4o": {
                "max_tokens": 16384,
                "max_input_tokens": 128000,
                "max_output_tokens": 16384,
                "input_cost_per_token": 2.5e-06,
                "output_cost_per_token": 1e-05,
                "cache_read_input_token_cost": 1.25e-06,
                "litellm_provider": "openai",
                "mode": "chat",
                "supports_vision": true,
                "supports_function_calling": true,
                "supports_prompt_caching": true
            },
            "ollama/llama3": {"max_tokens": 8192, "input_cost_per_token": 0.0, "litellm_provider": "ollama"}
        }"#;
        let table = parse_table(body).unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.contains_key("sample_spec"));

        let gpt = &table["gpt-4o"];
        assert_eq!(gpt.input_cost_per_token, Some(2.5e-06));
        assert_eq!(gpt.cache_read_cost_per_token, Some(1.25e-06));
        assert_eq!(gpt.max_input_tokens, Some(128_000));
        assert!(gpt.capabilities.vision);
        assert!(gpt.capabilities.function_calling);
        assert!(!gpt.capabilities.reasoning);
        assert_eq!(gpt.provider.as_deref(), Some("openai"));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let body = r#"{
            "good": {"input_cost_per_token": 1e-06},
            "bad": "not an object",
            "worse": {"supports_vision": "yes"}
        }"#;
        let table = parse_table(body).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["good"]);
    }

    #[test]
    fn non_object_body_is_an_error() {
        assert!(matches!(parse_table("[1, 2]"), Err(MimirError::Parse(_))));
        assert!(matches!(parse_table("nope"), Err(MimirError::Json(_))));
    }
}
