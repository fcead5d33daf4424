//! Reconciled model types.
//!
//! A [`MergedModel`] is rebuilt from raw source snapshots on every
//! reconciliation pass and carries no identity across passes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::record::LeaderboardEntry;

/// Source label for the configured model list.
pub const CONFIG_SOURCE: &str = "config";
/// Source label for the marketplace catalog.
pub const CATALOG_SOURCE: &str = "catalog";
/// Source label for the community pricing table.
pub const PRICING_SOURCE: &str = "pricing";

/// Source label for one leaderboard category, e.g. `"benchmark:code"`.
pub fn benchmark_source(category: &str) -> String {
    format!("benchmark:{category}")
}

/// Capability flags of a reconciled model. All default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub vision: bool,
    pub function_calling: bool,
    pub reasoning: bool,
    pub prompt_caching: bool,
}

/// Which source supplied the input price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Catalog,
    Pricing,
}

/// Reconciled pricing. Per-million prices are in USD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_million: Option<f64>,
    pub output_per_million: Option<f64>,
    pub cache_read_per_token: Option<f64>,
    pub image_input: Option<f64>,
    pub price_source: Option<PriceSource>,
}

/// A leaderboard score attached to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkScore {
    pub rating: f64,
    pub rating_upper: f64,
    pub rating_lower: f64,
    pub rank: u32,
    pub votes: u64,
}

impl From<&LeaderboardEntry> for BenchmarkScore {
    fn from(entry: &LeaderboardEntry) -> Self {
        Self {
            rating: entry.rating,
            rating_upper: entry.rating_upper,
            rating_lower: entry.rating_lower,
            rank: entry.rank,
            votes: entry.votes,
        }
    }
}

/// The canonical record for one model identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedModel {
    pub id: String,
    pub name: String,
    /// Logical name from the configured model list, if configured.
    pub configured_name: Option<String>,
    pub provider: String,
    pub description: Option<String>,
    pub context_length: Option<u64>,
    pub max_output_tokens: Option<u64>,
    pub modality: Option<String>,
    pub capabilities: Capabilities,
    pub pricing: Pricing,
    /// One key per benchmark category; `None` when no entry matched.
    pub benchmarks: BTreeMap<String, Option<BenchmarkScore>>,
    pub is_configured: bool,
    pub data_sources: BTreeSet<String>,
}

impl MergedModel {
    /// Score for a category, if the category exists and matched.
    pub fn benchmark(&self, category: &str) -> Option<&BenchmarkScore> {
        self.benchmarks.get(category).and_then(Option::as_ref)
    }
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Configured models in configuration order, then unconfigured catalog
    /// models in catalog order.
    pub models: Vec<MergedModel>,
    /// One human-readable line per degraded source (`"<source>: <message>"`).
    pub warnings: Vec<String>,
}

impl Reconciliation {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Result of a cache flush plus configuration reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub models_loaded: usize,
}

/// Health state as of the last aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// No pass has run yet.
    Unknown,
    Ok,
    Degraded,
}

/// Snapshot of the last aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub total_models: usize,
    pub configured_models: usize,
    pub warnings: Vec<String>,
    /// Seconds since the Unix epoch at which the last pass finished.
    pub last_pass_at: Option<u64>,
    pub version: String,
}
