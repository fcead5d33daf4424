//! Field-level merging of matched source records.
//!
//! [`MergeEngine::merge`] combines at most one record per source into a
//! [`MergedModel`]. Precedence per field:
//!
//! | Field | Precedence |
//! |---|---|
//! | `id` | catalog id → configured identifier → `"unknown"` |
//! | `name` | catalog display name → configured logical name → bare id |
//! | `context_length` | catalog → pricing `max_input_tokens` → pricing `max_tokens` |
//! | `max_output_tokens` | catalog → pricing |
//! | input/output price | catalog (if > 0) → pricing table (if > 0) |
//! | `cache_read_per_token` | pricing table only |
//! | capabilities | pricing flags, plus vision from an image-input catalog modality |
//! | benchmarks | one slot per category, `None` when unmatched |
//!
//! Models served by a local provider are forced to zero price with no
//! price source when [`PricingPolicy::free_local_models`] is set.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::matching::{bare_name, extract_provider};
use crate::types::{
    BenchmarkScore, CATALOG_SOURCE, CONFIG_SOURCE, Capabilities, CatalogEntry, ConfigEntry,
    LeaderboardEntry, MergedModel, PRICING_SOURCE, PriceSource, Pricing, PricingEntry,
    benchmark_source,
};

const PER_MILLION: f64 = 1_000_000.0;

/// Pricing overrides for locally-run models.
///
/// ```rust
/// # use mimir::PricingPolicy;
/// let policy = PricingPolicy::new().local_providers(["ollama", "lmstudio"]);
/// assert!(policy.is_local("LMStudio"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PricingPolicy {
    /// Report local models as free. Default: true.
    #[serde(default = "default_free_local_models")]
    pub free_local_models: bool,
    /// Providers whose models run locally. Default: `["ollama"]`.
    #[serde(default = "default_local_providers")]
    pub local_providers: Vec<String>,
}

fn default_free_local_models() -> bool {
    true
}

fn default_local_providers() -> Vec<String> {
    vec!["ollama".to_string()]
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_local_models: default_free_local_models(),
            local_providers: default_local_providers(),
        }
    }
}

impl PricingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn free_local_models(mut self, enabled: bool) -> Self {
        self.free_local_models = enabled;
        self
    }

    pub fn local_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.local_providers = providers.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive membership in [`local_providers`](Self::local_providers).
    pub fn is_local(&self, provider: &str) -> bool {
        self.local_providers
            .iter()
            .any(|p| p.eq_ignore_ascii_case(provider))
    }
}

/// The matched records for one model identity.
#[derive(Debug, Clone, Default)]
pub struct MergeInputs<'a> {
    config: Option<&'a ConfigEntry>,
    catalog: Option<&'a CatalogEntry>,
    pricing: Option<&'a PricingEntry>,
    benchmarks: Vec<(&'a str, Option<&'a LeaderboardEntry>)>,
    keep_config_id: bool,
}

impl<'a> MergeInputs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, entry: impl Into<Option<&'a ConfigEntry>>) -> Self {
        self.config = entry.into();
        self
    }

    pub fn catalog(mut self, entry: impl Into<Option<&'a CatalogEntry>>) -> Self {
        self.catalog = entry.into();
        self
    }

    pub fn pricing(mut self, entry: impl Into<Option<&'a PricingEntry>>) -> Self {
        self.pricing = entry.into();
        self
    }

    /// Add one benchmark category slot, matched or not.
    pub fn benchmark(mut self, category: &'a str, entry: Option<&'a LeaderboardEntry>) -> Self {
        self.benchmarks.push((category, entry));
        self
    }

    /// Use the configured identifier as the record id even when a catalog
    /// entry matched. Set for local-model fuzzy matches.
    pub fn keep_config_id(mut self, keep: bool) -> Self {
        self.keep_config_id = keep;
        self
    }
}

/// Builds [`MergedModel`]s under a [`PricingPolicy`].
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    policy: PricingPolicy,
}

impl MergeEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn merge(&self, inputs: &MergeInputs<'_>) -> MergedModel {
        let config = inputs.config;
        let catalog = inputs.catalog;
        let table = inputs.pricing;
        let mut pricing_used = false;

        let id = match (config, catalog) {
            (Some(c), _) if inputs.keep_config_id => c.model_identifier.clone(),
            (_, Some(cat)) => cat.id.clone(),
            (Some(c), None) => c.model_identifier.clone(),
            (None, None) => "unknown".to_string(),
        };
        let provider = config
            .map(|c| extract_provider(&c.model_identifier))
            .unwrap_or_else(|| extract_provider(&id));

        let name = catalog
            .map(|c| c.display_name.clone())
            .filter(|n| !n.is_empty())
            .or_else(|| config.map(|c| c.logical_name.clone()))
            .unwrap_or_else(|| bare_name(&id));

        let context_length = catalog
            .map(|c| c.context_length)
            .filter(|n| *n > 0)
            .or_else(|| {
                let from_table = table.and_then(|t| t.max_input_tokens.or(t.max_tokens));
                pricing_used |= from_table.is_some();
                from_table
            });

        let max_output_tokens = catalog.and_then(|c| c.max_output_tokens).or_else(|| {
            let from_table = table.and_then(|t| t.max_output_tokens);
            pricing_used |= from_table.is_some();
            from_table
        });

        let (mut pricing, price_from_table) = self.merge_pricing(catalog, table);
        if self.policy.free_local_models && self.policy.is_local(&provider) {
            pricing.input_per_million = Some(0.0);
            pricing.output_per_million = Some(0.0);
            pricing.price_source = None;
        } else {
            pricing_used |= price_from_table;
        }
        pricing_used |= pricing.cache_read_per_token.is_some();

        let flags = table.map(|t| t.capabilities).unwrap_or_default();
        pricing_used |= flags.any();
        let capabilities = Capabilities {
            vision: flags.vision || catalog.is_some_and(CatalogEntry::accepts_images),
            function_calling: flags.function_calling,
            reasoning: flags.reasoning,
            prompt_caching: flags.prompt_caching,
        };

        let mut data_sources = BTreeSet::new();
        if config.is_some() {
            data_sources.insert(CONFIG_SOURCE.to_string());
        }
        if catalog.is_some() {
            data_sources.insert(CATALOG_SOURCE.to_string());
        }
        if pricing_used {
            data_sources.insert(PRICING_SOURCE.to_string());
        }

        let mut benchmarks = BTreeMap::new();
        for (category, entry) in &inputs.benchmarks {
            if entry.is_some() {
                data_sources.insert(benchmark_source(category));
            }
            benchmarks.insert(category.to_string(), entry.map(BenchmarkScore::from));
        }

        MergedModel {
            id,
            name,
            configured_name: config.map(|c| c.logical_name.clone()),
            provider,
            description: catalog.and_then(|c| c.description.clone()),
            context_length,
            max_output_tokens,
            modality: catalog.and_then(|c| c.modality.clone()),
            capabilities,
            pricing,
            benchmarks,
            is_configured: config.is_some(),
            data_sources,
        }
    }

    /// Merged prices, and whether the pricing table supplied either of them.
    fn merge_pricing(
        &self,
        catalog: Option<&CatalogEntry>,
        table: Option<&PricingEntry>,
    ) -> (Pricing, bool) {
        let pick = |from_catalog: Option<f64>, from_table: Option<f64>| {
            let positive = |v: &f64| *v > 0.0;
            match from_catalog.filter(positive) {
                Some(v) => Some((v * PER_MILLION, PriceSource::Catalog)),
                None => from_table
                    .filter(positive)
                    .map(|v| (v * PER_MILLION, PriceSource::Pricing)),
            }
        };

        let input = pick(
            catalog.map(|c| c.pricing.prompt_cost_per_token),
            table.and_then(|t| t.input_cost_per_token),
        );
        let output = pick(
            catalog.map(|c| c.pricing.completion_cost_per_token),
            table.and_then(|t| t.output_cost_per_token),
        );
        let cache_read = table.and_then(|t| t.cache_read_cost_per_token);

        let from_table = [input, output]
            .iter()
            .flatten()
            .any(|(_, source)| *source == PriceSource::Pricing);

        let pricing = Pricing {
            input_per_million: input.map(|(v, _)| v),
            output_per_million: output.map(|(v, _)| v),
            cache_read_per_token: cache_read,
            image_input: catalog.and_then(|c| c.pricing.image_cost),
            price_source: input.map(|(_, source)| source),
        };
        (pricing, from_table)
    }
}
