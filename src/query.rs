//! Queries over a reconciled model list.
//!
//! Filtering, text search, sorting and cost estimation for callers that
//! present a [`Reconciliation`](crate::Reconciliation) to users.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::MergedModel;
use crate::{MimirError, Result};

const PER_MILLION: f64 = 1_000_000.0;

/// Keep models whose provider equals `provider`, ignoring case.
pub fn filter_by_provider(models: Vec<MergedModel>, provider: &str) -> Vec<MergedModel> {
    models
        .into_iter()
        .filter(|m| m.provider.eq_ignore_ascii_case(provider))
        .collect()
}

/// Keep models whose id, name or provider contains `needle`, ignoring case.
pub fn search(models: Vec<MergedModel>, needle: &str) -> Vec<MergedModel> {
    let needle = needle.to_lowercase();
    models
        .into_iter()
        .filter(|m| {
            m.id.to_lowercase().contains(&needle)
                || m.name.to_lowercase().contains(&needle)
                || m.provider.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Keep models with at least one known per-million price.
pub fn priced(models: Vec<MergedModel>) -> Vec<MergedModel> {
    models
        .into_iter()
        .filter(|m| {
            m.pricing.input_per_million.is_some() || m.pricing.output_per_million.is_some()
        })
        .collect()
}

/// Field a model list can be sorted by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    Name,
    Provider,
    ContextLength,
    InputPrice,
    OutputPrice,
    /// Leaderboard rating in one category.
    Rating(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// A parsed `field[:asc|desc]` sort expression.
///
/// ```rust
/// # use mimir::query::{SortDirection, SortField, SortKey};
/// let key: SortKey = "rating:code:desc".parse().unwrap();
/// assert_eq!(key.field, SortField::Rating("code".into()));
/// assert_eq!(key.direction, SortDirection::Descending);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl FromStr for SortKey {
    type Err = MimirError;

    fn from_str(s: &str) -> Result<Self> {
        let (field, direction) = match s.rsplit_once(':') {
            Some((field, "asc")) => (field, SortDirection::Ascending),
            Some((field, "desc")) => (field, SortDirection::Descending),
            _ => (s, SortDirection::Ascending),
        };
        let field = match field {
            "name" => SortField::Name,
            "provider" => SortField::Provider,
            "context_length" => SortField::ContextLength,
            "input_price" => SortField::InputPrice,
            "output_price" => SortField::OutputPrice,
            other => match other.strip_prefix("rating:") {
                Some(category) if !category.is_empty() => SortField::Rating(category.to_string()),
                _ => return Err(MimirError::Parse(format!("unknown sort field: {other}"))),
            },
        };
        Ok(Self { field, direction })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            SortField::Name => f.write_str("name")?,
            SortField::Provider => f.write_str("provider")?,
            SortField::ContextLength => f.write_str("context_length")?,
            SortField::InputPrice => f.write_str("input_price")?,
            SortField::OutputPrice => f.write_str("output_price")?,
            SortField::Rating(category) => write!(f, "rating:{category}")?,
        }
        match self.direction {
            SortDirection::Ascending => f.write_str(":asc"),
            SortDirection::Descending => f.write_str(":desc"),
        }
    }
}

enum SortValue<'a> {
    Text(&'a str),
    Number(f64),
}

impl SortField {
    fn value<'m>(&self, model: &'m MergedModel) -> Option<SortValue<'m>> {
        match self {
            Self::Name => Some(SortValue::Text(&model.name)),
            Self::Provider => Some(SortValue::Text(&model.provider)),
            Self::ContextLength => model.context_length.map(|n| SortValue::Number(n as f64)),
            Self::InputPrice => model.pricing.input_per_million.map(SortValue::Number),
            Self::OutputPrice => model.pricing.output_per_million.map(SortValue::Number),
            Self::Rating(category) => model
                .benchmark(category)
                .map(|score| SortValue::Number(score.rating)),
        }
    }
}

fn compare_values(a: &SortValue<'_>, b: &SortValue<'_>) -> Ordering {
    match (a, b) {
        (SortValue::Text(a), SortValue::Text(b)) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
        (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
        _ => Ordering::Equal,
    }
}

/// Stable sort by `key`. Models without a value sort last in either direction.
pub fn sort_models(models: &mut [MergedModel], key: &SortKey) {
    models.sort_by(|a, b| match (key.field.value(a), key.field.value(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = compare_values(&a, &b);
            match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
    });
}

/// Estimated spend for a workload on one model, in USD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// `None` when the model has no non-zero input price.
    pub input_cost: Option<f64>,
    /// `None` when the model has no non-zero output price.
    pub output_cost: Option<f64>,
    /// Present only when both parts are.
    pub total_cost: Option<f64>,
}

/// Estimate the cost of `requests` requests of `input_tokens` in and
/// `output_tokens` out. A `requests` of zero counts as one.
pub fn estimate_cost(
    model: &MergedModel,
    input_tokens: u64,
    output_tokens: u64,
    requests: u64,
) -> CostEstimate {
    let requests = requests.max(1) as f64;
    let part = |tokens: u64, price: Option<f64>| {
        price
            .filter(|p| *p != 0.0)
            .map(|p| tokens as f64 / PER_MILLION * p * requests)
    };
    let input_cost = part(input_tokens, model.pricing.input_per_million);
    let output_cost = part(output_tokens, model.pricing.output_per_million);
    let total_cost = match (input_cost, output_cost) {
        (Some(i), Some(o)) => Some(i + o),
        _ => None,
    };
    CostEstimate {
        input_cost,
        output_cost,
        total_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BenchmarkScore, Capabilities, Pricing};
    use std::collections::{BTreeMap, BTreeSet};

    fn model(id: &str, provider: &str, input: Option<f64>, rating: Option<f64>) -> MergedModel {
        let mut benchmarks = BTreeMap::new();
        benchmarks.insert(
            "text".to_string(),
            rating.map(|rating| BenchmarkScore {
                rating,
                rating_upper: rating,
                rating_lower: rating,
                rank: 1,
                votes: 10,
            }),
        );
        MergedModel {
            id: id.to_string(),
            name: id.rsplit('/').next().unwrap_or(id).to_string(),
            configured_name: None,
            provider: provider.to_string(),
            description: None,
            context_length: None,
            max_output_tokens: None,
            modality: None,
            capabilities: Capabilities::default(),
            pricing: Pricing {
                input_per_million: input,
                output_per_million: input.map(|p| p * 4.0),
                ..Pricing::default()
            },
            benchmarks,
            is_configured: true,
            data_sources: BTreeSet::new(),
        }
    }

    fn ids(models: &[MergedModel]) -> Vec<&str> {
        models.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn provider_filter_ignores_case() {
        let models = vec![
            model("openai/gpt-4o", "openai", Some(2.5), None),
            model("anthropic/claude", "anthropic", Some(3.0), None),
        ];
        assert_eq!(ids(&filter_by_provider(models, "OpenAI")), vec!["openai/gpt-4o"]);
    }

    #[test]
    fn search_covers_id_name_and_provider() {
        let models = vec![
            model("openai/gpt-4o", "openai", None, None),
            model("anthropic/claude", "anthropic", None, None),
            model("ollama/llama3", "ollama", None, None),
        ];
        assert_eq!(ids(&search(models.clone(), "CLAUDE")), vec!["anthropic/claude"]);
        assert_eq!(ids(&search(models, "llama")), vec!["ollama/llama3"]);
    }

    #[test]
    fn sort_key_parsing() {
        let key: SortKey = "context_length".parse().unwrap();
        assert_eq!(key.field, SortField::ContextLength);
        assert_eq!(key.direction, SortDirection::Ascending);

        let key: SortKey = "rating:text".parse().unwrap();
        assert_eq!(key.field, SortField::Rating("text".to_string()));
        assert_eq!(key.direction, SortDirection::Ascending);
        assert_eq!(key.to_string(), "rating:text:asc");

        assert!("arena_elo".parse::<SortKey>().is_err());
        assert!("rating:".parse::<SortKey>().is_err());
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let mut models = vec![
            model("a/unpriced", "a", None, None),
            model("b/cheap", "b", Some(0.5), None),
            model("c/dear", "c", Some(15.0), None),
        ];
        sort_models(&mut models, &"input_price:desc".parse().unwrap());
        assert_eq!(ids(&models), vec!["c/dear", "b/cheap", "a/unpriced"]);
        sort_models(&mut models, &"input_price".parse().unwrap());
        assert_eq!(ids(&models), vec!["b/cheap", "c/dear", "a/unpriced"]);
    }

    #[test]
    fn sort_by_rating() {
        let mut models = vec![
            model("x/low", "x", None, Some(1100.0)),
            model("x/none", "x", None, None),
            model("x/high", "x", None, Some(1400.0)),
        ];
        sort_models(&mut models, &"rating:text:desc".parse().unwrap());
        assert_eq!(ids(&models), vec!["x/high", "x/low", "x/none"]);
    }

    #[test]
    fn cost_estimate() {
        let m = model("openai/gpt-4o", "openai", Some(2.5), None);
        let cost = estimate_cost(&m, 1_000_000, 500_000, 2);
        assert_eq!(cost.input_cost, Some(5.0));
        assert_eq!(cost.output_cost, Some(10.0));
        assert_eq!(cost.total_cost, Some(15.0));

        let one = estimate_cost(&m, 1_000_000, 0, 0);
        assert_eq!(one.input_cost, Some(2.5));
    }

    #[test]
    fn free_or_unpriced_parts_have_no_cost() {
        let free = model("ollama/llama3", "ollama", Some(0.0), None);
        let cost = estimate_cost(&free, 1000, 1000, 1);
        assert_eq!(cost, CostEstimate::default());

        let unpriced = model("x/y", "x", None, None);
        assert_eq!(estimate_cost(&unpriced, 1000, 1000, 1).total_cost, None);
    }

    #[test]
    fn priced_drops_models_without_prices() {
        let models = vec![
            model("a/unpriced", "a", None, None),
            model("b/cheap", "b", Some(0.5), None),
        ];
        assert_eq!(ids(&priced(models)), vec!["b/cheap"]);
    }
}
