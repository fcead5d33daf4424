//! Mimir - model reconciliation engine
//!
//! This crate pulls model information from several independent sources (a
//! configured model list, a marketplace catalog, a community pricing table,
//! and competitive leaderboards), works out which records describe the same
//! model despite inconsistent naming, and merges them into one canonical
//! [`MergedModel`] per model.
//!
//! Every source is optional at runtime: a failing fetch degrades the result
//! with a warning instead of failing the pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use mimir::{Config, Mimir};
//!
//! #[tokio::main]
//! async fn main() -> mimir::Result<()> {
//!     let mut config = Config::load_or_default(None)?;
//!     config.apply_env()?;
//!     let mimir = Mimir::from_config(&config)?;
//!
//!     let pass = mimir.get_all_models(false).await?;
//!     for model in &pass.models {
//!         println!("{} ({}): {:?}", model.name, model.id, model.pricing.input_per_million);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Custom sources
//!
//! ```rust,no_run
//! use mimir::Mimir;
//! use mimir::sources::StaticConfig;
//! use mimir::types::ConfigEntry;
//!
//! # fn example() -> mimir::Result<()> {
//! let mimir = Mimir::builder()
//!     .config_provider(StaticConfig(vec![ConfigEntry::new("fast", "openai/gpt-4o-mini")]))
//!     .categories(["text"])
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod matching;
pub mod merge;
pub mod query;
pub mod reconciler;
pub mod sources;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, SourceCache};
pub use config::Config;
pub use error::{MimirError, Result};
pub use matching::{MatchPolicy, Matcher};
pub use merge::{MergeEngine, MergeInputs, PricingPolicy};
pub use reconciler::{Mimir, MimirBuilder};
pub use sources::{CatalogSource, ConfigProvider, LeaderboardSource, PricingSource, SourceOutcome};

// Re-export all types
pub use types::{
    BenchmarkScore, Capabilities, CapabilityFlags, CatalogEntry, CatalogPricing, ConfigEntry,
    HealthState, HealthStatus, LeaderboardEntry, MergedModel, PriceSource, Pricing, PricingEntry,
    Reconciliation, RefreshSummary,
};
