//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. Explicit path (`--config <path>`)
//! 2. `~/.mimir/config.toml` (user)
//! 3. `/etc/mimir/config.toml` (system)
//!
//! Every section is optional. A handful of environment variables override
//! file values, see [`Config::apply_env`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::matching::MatchPolicy;
use crate::merge::PricingPolicy;
use crate::reconciler::DEFAULT_CATEGORIES;
use crate::sources::{config_file, litellm, lmarena, openrouter};
use crate::{MimirError, Result};

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub pricing: PricingPolicy,
    #[serde(default)]
    pub matching: MatchPolicy,
}

/// Where the configured model list lives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelsConfig {
    /// LiteLLM proxy config file (default: `/app/config/config.yaml`).
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
        }
    }
}

fn default_config_path() -> PathBuf {
    PathBuf::from(config_file::DEFAULT_CONFIG_PATH)
}

/// Cache bounds and per-source TTLs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of cached entries (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Catalog TTL in seconds (default: 300).
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_secs: u64,
    /// Pricing table TTL in seconds (default: 1800).
    #[serde(default = "default_pricing_ttl")]
    pub pricing_ttl_secs: u64,
    /// Leaderboard TTL in seconds, per category (default: 1800).
    #[serde(default = "default_leaderboard_ttl")]
    pub leaderboard_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            catalog_ttl_secs: default_catalog_ttl(),
            pricing_ttl_secs: default_pricing_ttl(),
            leaderboard_ttl_secs: default_leaderboard_ttl(),
        }
    }
}

fn default_max_entries() -> u64 {
    CacheConfig::default().max_entries
}

fn default_catalog_ttl() -> u64 {
    openrouter::DEFAULT_TTL.as_secs()
}

fn default_pricing_ttl() -> u64 {
    litellm::DEFAULT_TTL.as_secs()
}

fn default_leaderboard_ttl() -> u64 {
    lmarena::DEFAULT_TTL.as_secs()
}

impl CacheSettings {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new().max_entries(self.max_entries)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    pub fn pricing_ttl(&self) -> Duration {
        Duration::from_secs(self.pricing_ttl_secs)
    }

    pub fn leaderboard_ttl(&self) -> Duration {
        Duration::from_secs(self.leaderboard_ttl_secs)
    }
}

/// Upstream endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcesConfig {
    /// OpenRouter base URL (default: `https://openrouter.ai`).
    #[serde(default = "default_openrouter_url")]
    pub openrouter_url: String,
    /// Full URL of the LiteLLM pricing JSON.
    #[serde(default = "default_litellm_pricing_url")]
    pub litellm_pricing_url: String,
    /// LMArena base URL (default: `https://arena.ai`).
    #[serde(default = "default_lmarena_url")]
    pub lmarena_url: String,
    /// Per-source timeout in seconds (default: 15).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Leaderboard categories (default: text, code, vision).
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            openrouter_url: default_openrouter_url(),
            litellm_pricing_url: default_litellm_pricing_url(),
            lmarena_url: default_lmarena_url(),
            timeout_secs: default_timeout(),
            categories: default_categories(),
        }
    }
}

fn default_openrouter_url() -> String {
    openrouter::DEFAULT_BASE_URL.to_string()
}

fn default_litellm_pricing_url() -> String {
    litellm::DEFAULT_URL.to_string()
}

fn default_lmarena_url() -> String {
    lmarena::DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Environment variables honoured by [`Config::apply_env`].
pub const ENV_OVERRIDES: &[&str] = &[
    "CONFIG_PATH",
    "OPENROUTER_CACHE_TTL",
    "LITELLM_PRICING_CACHE_TTL",
    "ARENA_CACHE_TTL",
    "OLLAMA_FREE",
];

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.mimir/config.toml`
    /// 3. `/etc/mimir/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but an absent user/system file yields the
    /// defaults. A missing explicit path is still an error.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path) {
            Ok(path) => Self::load_from_file(&path),
            Err(_) if explicit_path.is_none() => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MimirError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MimirError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(MimirError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".mimir").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/mimir/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(MimirError::Configuration(
            "No config file found. Create ~/.mimir/config.toml or /etc/mimir/config.toml"
                .to_string(),
        ))
    }

    /// Apply [`ENV_OVERRIDES`] from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply [`ENV_OVERRIDES`] through `lookup`.
    ///
    /// TTLs must parse as whole seconds. `OLLAMA_FREE` accepts
    /// `true`/`1`/`yes` and `false`/`0`/`no`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CONFIG_PATH").filter(|p| !p.trim().is_empty()) {
            self.models.config_path = PathBuf::from(path);
        }
        if let Some(v) = lookup("OPENROUTER_CACHE_TTL") {
            self.cache.catalog_ttl_secs = parse_secs("OPENROUTER_CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("LITELLM_PRICING_CACHE_TTL") {
            self.cache.pricing_ttl_secs = parse_secs("LITELLM_PRICING_CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("ARENA_CACHE_TTL") {
            self.cache.leaderboard_ttl_secs = parse_secs("ARENA_CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("OLLAMA_FREE") {
            self.pricing.free_local_models = parse_flag("OLLAMA_FREE", &v)?;
        }
        Ok(())
    }
}

fn parse_secs(var: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        MimirError::Configuration(format!("{var} must be a whole number of seconds, got {value:?}"))
    })
}

fn parse_flag(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(MimirError::Configuration(format!(
            "{var} must be a boolean, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_source_defaults() {
        let config = Config::default();
        assert_eq!(config.models.config_path, PathBuf::from("/app/config/config.yaml"));
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.cache.catalog_ttl_secs, 300);
        assert_eq!(config.cache.pricing_ttl_secs, 1800);
        assert_eq!(config.cache.leaderboard_ttl_secs, 1800);
        assert_eq!(config.sources.timeout_secs, 15);
        assert_eq!(config.sources.categories, vec!["text", "code", "vision"]);
        assert!(config.pricing.free_local_models);
        assert_eq!(config.matching.min_prefix_overlap, 4);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
            [cache]
            catalog_ttl_secs = 60

            [sources]
            categories = ["text", "webdev"]

            [pricing]
            local_providers = ["ollama", "lmstudio"]

            [matching]
            local_min_score = 1.5
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.catalog_ttl_secs, 60);
        // Defaults preserved
        assert_eq!(config.cache.pricing_ttl_secs, 1800);
        assert_eq!(config.sources.categories, vec!["text", "webdev"]);
        assert_eq!(config.sources.openrouter_url, "https://openrouter.ai");
        assert!(config.pricing.is_local("lmstudio"));
        assert!(config.pricing.free_local_models);
        assert_eq!(config.matching.local_min_score, Some(1.5));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("CONFIG_PATH", "/srv/litellm.yaml"),
            ("OPENROUTER_CACHE_TTL", "30"),
            ("ARENA_CACHE_TTL", " 600 "),
            ("OLLAMA_FREE", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.models.config_path, PathBuf::from("/srv/litellm.yaml"));
        assert_eq!(config.cache.catalog_ttl_secs, 30);
        assert_eq!(config.cache.pricing_ttl_secs, 1800);
        assert_eq!(config.cache.leaderboard_ttl_secs, 600);
        assert!(!config.pricing.free_local_models);
    }

    #[test]
    fn bad_env_values_are_configuration_errors() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|k| (k == "LITELLM_PRICING_CACHE_TTL").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, MimirError::Configuration(_)));

        let err = config
            .apply_env_with(|k| (k == "OLLAMA_FREE").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, MimirError::Configuration(_)));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let missing = Path::new("/definitely/not/here/mimir.toml");
        assert!(Config::load(Some(missing)).is_err());
        assert!(Config::load_or_default(Some(missing)).is_err());
    }
}
