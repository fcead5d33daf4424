//! Source traits and the concrete adapters behind them.
//!
//! The orchestrator only sees the four traits below. Each concrete adapter
//! owns its wire format, its cache key and its TTL, and reads through the
//! shared [`SourceCache`](crate::cache::SourceCache).
//!
//! | Trait | Adapter | Cache key |
//! |---|---|---|
//! | [`ConfigProvider`] | [`LiteLlmConfigFile`] | (none) |
//! | [`CatalogSource`] | [`OpenRouterCatalog`] | `openrouter_models` |
//! | [`PricingSource`] | [`LiteLlmPricing`] | `litellm_pricing` |
//! | [`LeaderboardSource`] | [`LmArenaLeaderboard`] | `lmarena_<category>` |

pub(crate) mod config_file;
pub(crate) mod litellm;
pub(crate) mod lmarena;
pub(crate) mod openrouter;

pub use config_file::{LiteLlmConfigFile, StaticConfig};
pub use litellm::LiteLlmPricing;
pub use lmarena::{LmArenaLeaderboard, parse_leaderboard_html};
pub use openrouter::OpenRouterCatalog;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::types::{CatalogEntry, ConfigEntry, LeaderboardEntry, PricingEntry};
use crate::{MimirError, Result};

/// Supplies the configured model list.
///
/// Never fails: a missing or unreadable list is an empty list.
pub trait ConfigProvider: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> Vec<ConfigEntry>;
}

/// Marketplace catalog of available models.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<CatalogEntry>>;
}

/// Per-token pricing and capability table keyed by model id.
#[async_trait]
pub trait PricingSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<BTreeMap<String, PricingEntry>>;
}

/// Competitive-ranking leaderboard, one fetch per category.
#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, category: &str) -> Result<Vec<LeaderboardEntry>>;
}

/// A source fetch lifted into success or a recorded degradation.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Ok(T),
    Degraded { source: String, reason: String },
}

impl<T> SourceOutcome<T> {
    /// Lift a fetch result. Fatal errors are returned as `Err` and must
    /// abort the pass; everything else becomes [`SourceOutcome::Degraded`].
    pub fn from_result(source: impl Into<String>, result: Result<T>) -> Result<Self> {
        match result {
            Ok(value) => Ok(Self::Ok(value)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(Self::Degraded {
                source: source.into(),
                reason: e.to_string(),
            }),
        }
    }

    /// `"<source>: <reason>"` for degraded outcomes.
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { source, reason } => Some(format!("{source}: {reason}")),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

impl<T: Default> SourceOutcome<T> {
    /// The fetched value, or an empty one with the warning pushed onto
    /// `warnings`.
    pub fn or_warn(self, warnings: &mut Vec<String>) -> T {
        if let Some(warning) = self.warning() {
            warnings.push(warning);
        }
        match self {
            Self::Ok(value) => value,
            Self::Degraded { .. } => T::default(),
        }
    }
}

/// HTTP client shared by the network adapters.
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MimirError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-success response into [`MimirError::Api`].
pub(crate) fn check_status(response: &reqwest::Response, what: &str) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        return Err(MimirError::Api {
            status: status.as_u16(),
            message: format!("{what} returned HTTP {status}"),
        });
    }
    Ok(())
}

/// Deserializers for numeric fields that upstream payloads sometimes
/// encode as strings.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer, de::IgnoredAny};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
        #[allow(dead_code)]
        Other(IgnoredAny),
    }

    pub(crate) fn opt_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Loose>::deserialize(deserializer)? {
            Some(Loose::Number(n)) if n.is_finite() => Some(n),
            Some(Loose::Text(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        })
    }

    pub(crate) fn opt_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(opt_f64(deserializer)?
            .filter(|n| *n >= 0.0)
            .map(|n| n as u64))
    }
}
