//! Telemetry metric name constants.
//!
//! Centralised metric names for mimir operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mimir_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `source`: source label (e.g. "openrouter", "litellm", "lmarena/code")
//! - `status`: outcome: "ok" or "error" (or "degraded" for passes)
//! - `key`: cache key

/// Total source fetches issued by the orchestrator.
///
/// Labels: `source`, `status` ("ok" | "error").
pub const SOURCE_FETCHES_TOTAL: &str = "mimir_source_fetches_total";

/// Source fetch duration in seconds, cache hits included.
///
/// Labels: `source`.
pub const SOURCE_FETCH_DURATION_SECONDS: &str = "mimir_source_fetch_duration_seconds";

/// Total cache hits.
///
/// Labels: `key`.
pub const CACHE_HITS_TOTAL: &str = "mimir_cache_hits_total";

/// Total cache misses (absent or expired).
///
/// Labels: `key`.
pub const CACHE_MISSES_TOTAL: &str = "mimir_cache_misses_total";

/// Total reconciliation passes.
///
/// Labels: `status` ("ok" | "degraded").
pub const RECONCILIATIONS_TOTAL: &str = "mimir_reconciliations_total";

/// Number of merged models produced per pass.
pub const MODELS_MERGED: &str = "mimir_models_merged";
