//! Public types for the Mimir API.

mod model;
mod record;

pub use model::{
    BenchmarkScore, CATALOG_SOURCE, CONFIG_SOURCE, Capabilities, HealthState, HealthStatus,
    MergedModel, PRICING_SOURCE, PriceSource, Pricing, Reconciliation, RefreshSummary,
    benchmark_source,
};
pub use record::{
    CapabilityFlags, CatalogEntry, CatalogPricing, ConfigEntry, LeaderboardEntry, PricingEntry,
};
