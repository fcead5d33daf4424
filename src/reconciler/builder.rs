//! Builder for configuring engine instances

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use super::{DEFAULT_CATEGORIES, DEFAULT_FETCH_TIMEOUT, Mimir};
use crate::cache::{CacheConfig, Clock, SourceCache, SystemClock};
use crate::config::Config;
use crate::matching::{MatchPolicy, Matcher};
use crate::merge::{MergeEngine, PricingPolicy};
use crate::sources::{
    CatalogSource, ConfigProvider, LeaderboardSource, LiteLlmConfigFile, LiteLlmPricing,
    LmArenaLeaderboard, OpenRouterCatalog, PricingSource,
};
use crate::{MimirError, Result};

/// Builder for configuring engine instances.
///
/// Only the configuration provider is required. Sources left unset are
/// treated as empty on every pass.
pub struct MimirBuilder {
    config: Option<Arc<dyn ConfigProvider>>,
    catalog: Option<Arc<dyn CatalogSource>>,
    pricing: Option<Arc<dyn PricingSource>>,
    leaderboard: Option<Arc<dyn LeaderboardSource>>,
    categories: Option<Vec<String>>,
    cache: Option<Arc<SourceCache>>,
    cache_config: CacheConfig,
    clock: Option<Arc<dyn Clock>>,
    match_policy: MatchPolicy,
    pricing_policy: PricingPolicy,
    fetch_timeout: Duration,
}

impl Default for MimirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MimirBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            catalog: None,
            pricing: None,
            leaderboard: None,
            categories: None,
            cache: None,
            cache_config: CacheConfig::default(),
            clock: None,
            match_policy: MatchPolicy::default(),
            pricing_policy: PricingPolicy::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Set the configured-model provider.
    pub fn config_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.config = Some(Arc::new(provider));
        self
    }

    /// Set the catalog source.
    pub fn catalog(mut self, source: impl CatalogSource + 'static) -> Self {
        self.catalog = Some(Arc::new(source));
        self
    }

    /// Set the pricing-table source.
    pub fn pricing(mut self, source: impl PricingSource + 'static) -> Self {
        self.pricing = Some(Arc::new(source));
        self
    }

    /// Set the leaderboard source.
    pub fn leaderboard(mut self, source: impl LeaderboardSource + 'static) -> Self {
        self.leaderboard = Some(Arc::new(source));
        self
    }

    /// Leaderboard categories fetched on every pass (default: text, code, vision).
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Share an existing cache. Adapters built against the same cache
    /// should be given this one so [`Mimir::refresh`] reaches them.
    pub fn cache(mut self, cache: Arc<SourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Bounds for a cache created by [`build`](Self::build). Ignored when a
    /// cache is supplied with [`cache`](Self::cache).
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Clock for a cache created by [`build`](Self::build).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn pricing_policy(mut self, policy: PricingPolicy) -> Self {
        self.pricing_policy = policy;
        self
    }

    /// Per-source fetch timeout (default: 15 s).
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<Mimir> {
        let Some(config) = self.config else {
            return Err(MimirError::Configuration(
                "no configuration provider set".to_string(),
            ));
        };
        if self.fetch_timeout.is_zero() {
            return Err(MimirError::Configuration(
                "fetch timeout must be non-zero".to_string(),
            ));
        }

        let cache = match self.cache {
            Some(cache) => cache,
            None => {
                let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
                Arc::new(SourceCache::with_clock(&self.cache_config, clock))
            }
        };
        let categories = self
            .categories
            .unwrap_or_else(|| DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect());

        debug!(
            config = config.name(),
            catalog = self.catalog.as_ref().map(|s| s.name().to_string()),
            pricing = self.pricing.as_ref().map(|s| s.name().to_string()),
            leaderboard = self.leaderboard.as_ref().map(|s| s.name().to_string()),
            categories = ?categories,
            "building engine"
        );

        Ok(Mimir {
            config,
            catalog: self.catalog,
            pricing: self.pricing,
            leaderboard: self.leaderboard,
            categories,
            cache,
            matcher: Matcher::new(self.match_policy),
            merger: MergeEngine::new(self.pricing_policy),
            fetch_timeout: self.fetch_timeout,
            last_pass: RwLock::new(None),
        })
    }
}

impl Mimir {
    /// Build the default adapter set (LiteLLM config file, OpenRouter,
    /// LiteLLM pricing, LMArena) from settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Arc::new(SourceCache::with_config(&config.cache.cache_config()));
        let sources = &config.sources;
        let timeout = sources.timeout();

        let catalog = OpenRouterCatalog::with_base_url(&sources.openrouter_url, cache.clone())?
            .ttl(config.cache.catalog_ttl())
            .timeout(timeout)?;
        let pricing = LiteLlmPricing::with_url(&sources.litellm_pricing_url, cache.clone())?
            .ttl(config.cache.pricing_ttl())
            .timeout(timeout)?;
        let leaderboard = LmArenaLeaderboard::with_base_url(&sources.lmarena_url, cache.clone())?
            .ttl(config.cache.leaderboard_ttl())
            .timeout(timeout)?;

        Self::builder()
            .config_provider(LiteLlmConfigFile::new(&config.models.config_path))
            .catalog(catalog)
            .pricing(pricing)
            .leaderboard(leaderboard)
            .categories(sources.categories.iter().cloned())
            .cache(cache)
            .match_policy(config.matching.clone())
            .pricing_policy(config.pricing.clone())
            .fetch_timeout(timeout)
            .build()
    }
}
