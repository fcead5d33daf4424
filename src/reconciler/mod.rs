//! Aggregation orchestrator.
//!
//! [`Mimir`] fetches every source concurrently, lifts each fetch into a
//! [`SourceOutcome`], and reconciles whatever arrived into one
//! [`MergedModel`] per identity. A failing source costs a warning, never
//! the pass; only a [`MimirError::Cache`] aborts.
//!
//! Result order: configured entries in configuration order (wildcards
//! expanded in catalog order), then unconfigured catalog entries in catalog
//! order. A later record with an id already present replaces it in place.

mod builder;

pub use builder::MimirBuilder;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::SourceCache;
use crate::matching::{
    Index, Matcher, catalog_index, extract_provider, leaderboard_index, pricing_index,
};
use crate::merge::{MergeEngine, MergeInputs};
use crate::sources::{
    CatalogSource, ConfigProvider, LeaderboardSource, PricingSource, SourceOutcome,
};
use crate::telemetry;
use crate::types::{
    CatalogEntry, ConfigEntry, HealthState, HealthStatus, LeaderboardEntry, MergedModel,
    PricingEntry, Reconciliation, RefreshSummary,
};
use crate::{MimirError, Result};

/// Leaderboard categories fetched when none are configured.
pub const DEFAULT_CATEGORIES: &[&str] = &["text", "code", "vision"];

/// Per-source fetch timeout applied by the orchestrator.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
struct PassSummary {
    total_models: usize,
    configured_models: usize,
    warnings: Vec<String>,
    finished_at: u64,
}

/// The reconciliation engine.
///
/// ```rust,no_run
/// # async fn example() -> mimir::Result<()> {
/// let mimir = mimir::Mimir::from_config(&mimir::Config::default())?;
/// let pass = mimir.get_all_models(false).await?;
/// for warning in &pass.warnings {
///     eprintln!("degraded: {warning}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Mimir {
    config: Arc<dyn ConfigProvider>,
    catalog: Option<Arc<dyn CatalogSource>>,
    pricing: Option<Arc<dyn PricingSource>>,
    leaderboard: Option<Arc<dyn LeaderboardSource>>,
    categories: Vec<String>,
    cache: Arc<SourceCache>,
    matcher: Matcher,
    merger: MergeEngine,
    fetch_timeout: Duration,
    last_pass: RwLock<Option<PassSummary>>,
}

/// Snapshot of every source for one pass.
struct Snapshot {
    config: Vec<ConfigEntry>,
    catalog: Vec<CatalogEntry>,
    pricing: BTreeMap<String, PricingEntry>,
    leaderboards: Vec<(String, Vec<LeaderboardEntry>)>,
    warnings: Vec<String>,
}

/// Insertion-ordered result set keyed by model id.
#[derive(Default)]
struct ModelSet {
    models: Vec<MergedModel>,
    positions: HashMap<String, usize>,
}

impl ModelSet {
    fn insert(&mut self, model: MergedModel) {
        match self.positions.get(&model.id) {
            Some(&at) => self.models[at] = model,
            None => {
                self.positions.insert(model.id.clone(), self.models.len());
                self.models.push(model);
            }
        }
    }

    fn len(&self) -> usize {
        self.models.len()
    }

    fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    fn into_vec(self) -> Vec<MergedModel> {
        self.models
    }
}

/// Per-pass lookup indices over a [`Snapshot`].
struct Indices<'s> {
    catalog: Index<&'s CatalogEntry>,
    pricing: Index<(&'s str, &'s PricingEntry)>,
    leaderboards: Vec<(&'s str, Index<&'s LeaderboardEntry>)>,
}

impl<'s> Indices<'s> {
    fn build(snapshot: &'s Snapshot) -> Self {
        Self {
            catalog: catalog_index(&snapshot.catalog),
            pricing: pricing_index(&snapshot.pricing),
            leaderboards: snapshot
                .leaderboards
                .iter()
                .map(|(category, entries)| (category.as_str(), leaderboard_index(entries)))
                .collect(),
        }
    }
}

impl Mimir {
    /// Create a new builder.
    pub fn builder() -> MimirBuilder {
        MimirBuilder::new()
    }

    /// Reconcile every source into one record per model.
    ///
    /// With `include_unconfigured`, catalog models absent from the
    /// configured list are appended with `is_configured = false`.
    pub async fn get_all_models(&self, include_unconfigured: bool) -> Result<Reconciliation> {
        let start = Instant::now();
        let snapshot = self.snapshot().await?;
        debug!(
            config = snapshot.config.len(),
            catalog = snapshot.catalog.len(),
            pricing = snapshot.pricing.len(),
            leaderboards = snapshot.leaderboards.len(),
            warnings = snapshot.warnings.len(),
            "source snapshot"
        );

        let (models, configured_models) = self.build_models(&snapshot, include_unconfigured);
        let warnings = snapshot.warnings;
        let status = if warnings.is_empty() { "ok" } else { "degraded" };
        metrics::counter!(telemetry::RECONCILIATIONS_TOTAL, "status" => status).increment(1);
        metrics::histogram!(telemetry::MODELS_MERGED).record(models.len() as f64);
        info!(
            models = models.len(),
            configured = configured_models,
            warnings = warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "reconciliation pass complete"
        );

        *self.last_pass.write().await = Some(PassSummary {
            total_models: models.len(),
            configured_models: models.iter().filter(|m| m.is_configured).count(),
            warnings: warnings.clone(),
            finished_at: unix_now(),
        });

        Ok(Reconciliation { models, warnings })
    }

    /// The record whose id is `id` after a full pass, including
    /// unconfigured catalog models.
    pub async fn get_model_by_id(&self, id: &str) -> Result<Option<MergedModel>> {
        let pass = self.get_all_models(true).await?;
        Ok(pass.models.into_iter().find(|m| m.id == id))
    }

    /// Flush every cached source response and reload the configured list.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        self.cache.flush_all();
        let models_loaded = self.config.load().len();
        info!(models_loaded, "flushed source cache and reloaded configuration");
        Ok(RefreshSummary { models_loaded })
    }

    /// Health as of the most recent [`get_all_models`](Self::get_all_models).
    pub async fn health(&self) -> HealthStatus {
        let version = crate::version::version_string();
        match self.last_pass.read().await.as_ref() {
            None => HealthStatus {
                status: HealthState::Unknown,
                total_models: 0,
                configured_models: 0,
                warnings: Vec::new(),
                last_pass_at: None,
                version,
            },
            Some(pass) => HealthStatus {
                status: if pass.warnings.is_empty() {
                    HealthState::Ok
                } else {
                    HealthState::Degraded
                },
                total_models: pass.total_models,
                configured_models: pass.configured_models,
                warnings: pass.warnings.clone(),
                last_pass_at: Some(pass.finished_at),
                version,
            },
        }
    }

    /// Shared source cache.
    pub fn cache(&self) -> &Arc<SourceCache> {
        &self.cache
    }

    /// Leaderboard categories fetched on every pass.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    async fn snapshot(&self) -> Result<Snapshot> {
        let config = self.config.load();
        let (catalog, pricing, leaderboards) = tokio::join!(
            self.fetch_catalog(),
            self.fetch_pricing(),
            self.fetch_leaderboards(),
        );

        let mut warnings = Vec::new();
        let catalog = catalog?.or_warn(&mut warnings);
        let pricing = pricing?.or_warn(&mut warnings);
        let mut boards = Vec::with_capacity(leaderboards.len());
        for (category, outcome) in leaderboards {
            boards.push((category, outcome?.or_warn(&mut warnings)));
        }

        Ok(Snapshot {
            config,
            catalog,
            pricing,
            leaderboards: boards,
            warnings,
        })
    }

    async fn fetch_catalog(&self) -> Result<SourceOutcome<Vec<CatalogEntry>>> {
        match &self.catalog {
            Some(source) => self.timed(source.name(), source.fetch()).await,
            None => Ok(SourceOutcome::Ok(Vec::new())),
        }
    }

    async fn fetch_pricing(&self) -> Result<SourceOutcome<BTreeMap<String, PricingEntry>>> {
        match &self.pricing {
            Some(source) => self.timed(source.name(), source.fetch()).await,
            None => Ok(SourceOutcome::Ok(BTreeMap::new())),
        }
    }

    async fn fetch_leaderboards(
        &self,
    ) -> Vec<(String, Result<SourceOutcome<Vec<LeaderboardEntry>>>)> {
        let Some(source) = &self.leaderboard else {
            return Vec::new();
        };
        join_all(self.categories.iter().map(|category| async move {
            let label = format!("{}/{category}", source.name());
            let outcome = self.timed(&label, source.fetch(category)).await;
            (category.clone(), outcome)
        }))
        .await
    }

    /// Run one source fetch under the orchestrator's timeout and record it.
    async fn timed<T, F>(&self, label: &str, fetch: F) -> Result<SourceOutcome<T>>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(MimirError::Timeout {
                source_name: label.to_string(),
                after: self.fetch_timeout,
            }),
        };

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::SOURCE_FETCHES_TOTAL,
            "source" => label.to_owned(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::SOURCE_FETCH_DURATION_SECONDS,
            "source" => label.to_owned(),
        )
        .record(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(source = label, error = %e, fatal = e.is_fatal(), "source fetch failed");
        }
        SourceOutcome::from_result(label, result)
    }

    // ========================================================================
    // Matching and merging
    // ========================================================================

    fn build_models(
        &self,
        snapshot: &Snapshot,
        include_unconfigured: bool,
    ) -> (Vec<MergedModel>, usize) {
        let indices = Indices::build(snapshot);
        let mut models = ModelSet::default();

        for entry in &snapshot.config {
            if entry.is_wildcard() {
                let prefix = entry.wildcard_prefix();
                let mut expanded = 0usize;
                for listed in snapshot
                    .catalog
                    .iter()
                    .filter(|c| c.id.to_lowercase().starts_with(&prefix))
                {
                    expanded += 1;
                    let model =
                        self.merge_one(Some(entry), Some(listed), false, &listed.id, &indices);
                    models.insert(model);
                }
                debug!(
                    identifier = %entry.model_identifier,
                    expanded,
                    "expanded wildcard entry"
                );
                continue;
            }
            models.insert(self.reconcile_configured(entry, snapshot, &indices));
        }

        let configured = models.len();
        if include_unconfigured {
            for listed in &snapshot.catalog {
                if !models.contains(&listed.id) {
                    let model = self.merge_one(None, Some(listed), false, &listed.id, &indices);
                    models.insert(model);
                }
            }
        }
        (models.into_vec(), configured)
    }

    fn reconcile_configured(
        &self,
        entry: &ConfigEntry,
        snapshot: &Snapshot,
        indices: &Indices<'_>,
    ) -> MergedModel {
        let identifier = entry.model_identifier.as_str();
        let mut listed = self.matcher.find_strict(identifier, &indices.catalog).copied();
        let mut local_fuzzy = false;

        if listed.is_none() && self.merger.policy().is_local(&extract_provider(identifier)) {
            listed = self.matcher.find_local(identifier, &snapshot.catalog);
            local_fuzzy = listed.is_some();
        }

        let model = self.merge_one(Some(entry), listed, local_fuzzy, identifier, indices);
        debug!(
            logical_name = %entry.logical_name,
            identifier,
            catalog = listed.map(|c| c.id.as_str()),
            local_fuzzy,
            sources = ?model.data_sources,
            "matched configured model"
        );
        model
    }

    /// Look up pricing and benchmarks for one identity and merge.
    ///
    /// `lookup_id` is tried first; the catalog id, when different, second.
    fn merge_one(
        &self,
        config: Option<&ConfigEntry>,
        catalog: Option<&CatalogEntry>,
        keep_config_id: bool,
        lookup_id: &str,
        indices: &Indices<'_>,
    ) -> MergedModel {
        let fallback_id = catalog.map(|c| c.id.as_str()).filter(|id| *id != lookup_id);

        let priced = self
            .matcher
            .find_strict(lookup_id, &indices.pricing)
            .or_else(|| fallback_id.and_then(|id| self.matcher.find_strict(id, &indices.pricing)))
            .map(|&(_, entry)| entry);

        let mut inputs = MergeInputs::new()
            .config(config)
            .catalog(catalog)
            .pricing(priced)
            .keep_config_id(keep_config_id);
        for (category, index) in &indices.leaderboards {
            let scored = self
                .matcher
                .find(lookup_id, index)
                .or_else(|| fallback_id.and_then(|id| self.matcher.find(id, index)))
                .copied();
            inputs = inputs.benchmark(*category, scored);
        }
        self.merger.merge(&inputs)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
