//! Configured model list from a LiteLLM proxy config file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use super::ConfigProvider;
use crate::types::ConfigEntry;

/// Default location of the LiteLLM proxy config.
pub const DEFAULT_CONFIG_PATH: &str = "/app/config/config.yaml";

#[derive(Debug, Deserialize)]
struct ProxyConfig {
    #[serde(default)]
    model_list: Option<Vec<ModelListEntry>>,
}

#[derive(Debug, Deserialize)]
struct ModelListEntry {
    #[serde(default)]
    model_name: Option<String>,
    #[serde(default)]
    litellm_params: Option<LiteLlmParams>,
}

#[derive(Debug, Deserialize)]
struct LiteLlmParams {
    #[serde(default)]
    model: Option<String>,
}

/// Reads `model_list` from a LiteLLM proxy YAML file on every
/// [`load`](ConfigProvider::load).
///
/// ```yaml
/// model_list:
///   - model_name: gpt-4o
///     litellm_params:
///       model: openai/gpt-4o
/// ```
#[derive(Debug, Clone)]
pub struct LiteLlmConfigFile {
    path: PathBuf,
}

impl LiteLlmConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for LiteLlmConfigFile {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigProvider for LiteLlmConfigFile {
    fn name(&self) -> &str {
        "config"
    }

    fn load(&self) -> Vec<ConfigEntry> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "config file not found, using empty model list");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read config file");
                return Vec::new();
            }
        };
        parse_model_list(&content, &self.path)
    }
}

fn parse_model_list(content: &str, path: &Path) -> Vec<ConfigEntry> {
    let config: Option<ProxyConfig> = match serde_yaml::from_str(content) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse config file");
            return Vec::new();
        }
    };
    let Some(list) = config.and_then(|c| c.model_list) else {
        warn!(path = %path.display(), "no model_list found in config");
        return Vec::new();
    };

    list.into_iter()
        .filter_map(|entry| {
            let model = entry.litellm_params.and_then(|p| p.model);
            match (entry.model_name, model) {
                (Some(name), Some(model)) => Some(ConfigEntry::new(name, model)),
                // unnamed entries are exposed under their identifier
                (None, Some(model)) => Some(ConfigEntry::new(model.clone(), model)),
                (name, None) => {
                    debug!(
                        model_name = ?name,
                        "skipping model_list entry without litellm_params.model"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Fixed in-memory model list.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub Vec<ConfigEntry>);

impl ConfigProvider for StaticConfig {
    fn name(&self) -> &str {
        "config"
    }

    fn load(&self) -> Vec<ConfigEntry> {
        self.0.clone()
    }
}
