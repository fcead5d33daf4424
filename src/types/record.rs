//! Raw records as delivered by each source, after wire-format decoding.
//!
//! These are the source-neutral inputs to matching and merging. Each
//! adapter in [`sources`](crate::sources) converts its own payload into one
//! of these types.

use serde::{Deserialize, Serialize};

/// One entry of the configured model list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Name the deployment exposes the model under (e.g. "gpt-4o").
    pub logical_name: String,
    /// Upstream model identifier (e.g. "openai/gpt-4o", "ollama/llama3:8b",
    /// or a wildcard such as "openrouter/*").
    pub model_identifier: String,
}

impl ConfigEntry {
    pub fn new(logical_name: impl Into<String>, model_identifier: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            model_identifier: model_identifier.into(),
        }
    }

    /// Whether the identifier ends in a wildcard marker.
    pub fn is_wildcard(&self) -> bool {
        self.model_identifier.ends_with('*')
    }

    /// Lowercased identifier with the wildcard marker removed.
    ///
    /// Only meaningful when [`is_wildcard`](Self::is_wildcard) is true.
    pub fn wildcard_prefix(&self) -> String {
        self.model_identifier.replace('*', "").to_lowercase()
    }
}

/// Catalog pricing, in cost per single token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPricing {
    pub prompt_cost_per_token: f64,
    pub completion_cost_per_token: f64,
    pub image_cost: Option<f64>,
}

/// A model listed by the marketplace catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub context_length: u64,
    pub max_output_tokens: Option<u64>,
    /// Modality string, e.g. `"text+image->text"`.
    pub modality: Option<String>,
    pub pricing: CatalogPricing,
}

impl CatalogEntry {
    /// Minimal entry with zero pricing; used by tests and mocks.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: None,
            context_length: 0,
            max_output_tokens: None,
            modality: None,
            pricing: CatalogPricing::default(),
        }
    }

    pub fn with_context_length(mut self, tokens: u64) -> Self {
        self.context_length = tokens;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    pub fn with_pricing(mut self, prompt: f64, completion: f64) -> Self {
        self.pricing.prompt_cost_per_token = prompt;
        self.pricing.completion_cost_per_token = completion;
        self
    }

    /// Whether the modality accepts images as input.
    pub fn accepts_images(&self) -> bool {
        self.modality
            .as_deref()
            .map(|m| m.split("->").next().unwrap_or(m).contains("image"))
            .unwrap_or(false)
    }
}

/// Capability flags reported by the pricing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub vision: bool,
    pub function_calling: bool,
    pub reasoning: bool,
    pub prompt_caching: bool,
}

impl CapabilityFlags {
    pub fn any(&self) -> bool {
        self.vision || self.function_calling || self.reasoning || self.prompt_caching
    }
}

/// One row of the community pricing table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingEntry {
    pub input_cost_per_token: Option<f64>,
    pub output_cost_per_token: Option<f64>,
    pub cache_read_cost_per_token: Option<f64>,
    pub max_tokens: Option<u64>,
    pub max_input_tokens: Option<u64>,
    pub max_output_tokens: Option<u64>,
    /// Provider name as spelled by the pricing table.
    pub provider: Option<String>,
    /// Model mode (e.g. "chat", "embedding").
    pub mode: Option<String>,
    pub capabilities: CapabilityFlags,
}

/// One row of a competitive-ranking leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub category: String,
    pub display_name: String,
    pub rating: f64,
    pub rating_upper: f64,
    pub rating_lower: f64,
    pub rank: u32,
    pub votes: u64,
}

impl LeaderboardEntry {
    /// Entry whose confidence bounds collapse onto the rating.
    pub fn new(category: impl Into<String>, display_name: impl Into<String>, rating: f64) -> Self {
        Self {
            category: category.into(),
            display_name: display_name.into(),
            rating,
            rating_upper: rating,
            rating_lower: rating,
            rank: 0,
            votes: 0,
        }
    }
}
