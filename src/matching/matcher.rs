//! Cross-source matching.
//!
//! Three tiers, from strict to permissive:
//!
//! - [`Matcher::find_strict`]: direct id, lowercase id, normalized id, bare
//!   name. Used against the catalog and the pricing table.
//! - [`Matcher::find`]: every [`candidate_keys`] variant, then a
//!   prefix-overlap scan over the whole index. Used against leaderboards.
//! - [`Matcher::find_local`]: scored fuzzy match of a locally-run
//!   `family:size` tag against catalog entries.
//!
//! All tiers are heuristic. [`MatchPolicy`] holds the knobs that bound how
//! far the permissive tiers may reach.

use serde::Deserialize;
use tracing::debug;

use super::index::Index;
use super::normalize::{aggressive, bare_name, candidate_keys, hyphenate, normalize};
use crate::types::CatalogEntry;

/// Tunable limits for the heuristic tiers.
///
/// ```rust
/// # use mimir::MatchPolicy;
/// let policy = MatchPolicy::new().min_prefix_overlap(6).local_min_score(1.0);
/// assert_eq!(policy.min_prefix_overlap, 6);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchPolicy {
    /// Keys and candidates shorter than this never take part in
    /// prefix-overlap matching. Default: 4.
    #[serde(default = "default_min_prefix_overlap")]
    pub min_prefix_overlap: usize,
    /// Reject the best local candidate when its score is below this.
    /// Default: unset (accept the best candidate).
    #[serde(default)]
    pub local_min_score: Option<f64>,
}

fn default_min_prefix_overlap() -> usize {
    4
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            min_prefix_overlap: default_min_prefix_overlap(),
            local_min_score: None,
        }
    }
}

impl MatchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum length for prefix-overlap participants.
    pub fn min_prefix_overlap(mut self, len: usize) -> Self {
        self.min_prefix_overlap = len;
        self
    }

    /// Set the minimum accepted local-match score.
    pub fn local_min_score(mut self, score: f64) -> Self {
        self.local_min_score = Some(score);
        self
    }
}

/// Finds the record in another source that describes the same model.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    policy: MatchPolicy,
}

impl Matcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    /// Strict lookup: direct, lowercase, normalized, bare name.
    pub fn find_strict<'i, T>(&self, identifier: &str, index: &'i Index<T>) -> Option<&'i T> {
        let lower = identifier.to_lowercase();
        [
            identifier.to_string(),
            lower,
            normalize(identifier),
            bare_name(identifier),
        ]
        .iter()
        .find_map(|key| index.get(key))
    }

    /// Full lookup: direct, lowercase, every candidate key in preference
    /// order, then prefix overlap.
    pub fn find<'i, T>(&self, identifier: &str, index: &'i Index<T>) -> Option<&'i T> {
        if let Some(hit) = index
            .get(identifier)
            .or_else(|| index.get(&identifier.to_lowercase()))
        {
            return Some(hit);
        }
        if let Some(hit) = candidate_keys(identifier)
            .iter()
            .find_map(|key| index.get(key))
        {
            return Some(hit);
        }
        self.find_by_prefix(identifier, index)
    }

    /// Last resort: first index key (in registration order) that starts
    /// with the aggressive form of the identifier, or that it starts with.
    fn find_by_prefix<'i, T>(&self, identifier: &str, index: &'i Index<T>) -> Option<&'i T> {
        let min = self.policy.min_prefix_overlap;
        let needle = aggressive(&bare_name(identifier));
        if needle.len() < min {
            return None;
        }
        let key = index
            .keys()
            .filter(|key| key.len() >= min)
            .find(|key| key.starts_with(needle.as_str()) || needle.starts_with(key))?;
        debug!(identifier, key, "prefix-overlap match");
        index.get(key)
    }

    /// Scored fuzzy match of a locally-run model (`[provider/]family[:size]`)
    /// against catalog entries.
    ///
    /// Keeps entries whose bare name contains the family (as typed or
    /// hyphenated at letter/digit boundaries) and the size tag, both on token
    /// boundaries. Scores +2 for instruction/chat-tuned variants, +1 for
    /// non-free variants, minus 0.01 per character of bare name. The highest
    /// score wins; ties go to the first entry enumerated.
    pub fn find_local<'a, I>(&self, identifier: &str, catalog: I) -> Option<&'a CatalogEntry>
    where
        I: IntoIterator<Item = &'a CatalogEntry>,
    {
        let tail = identifier.rsplit('/').next().unwrap_or(identifier);
        let (family, size) = match tail.split_once(':') {
            Some((family, size)) => (family, Some(size.to_lowercase())),
            None => (tail, None),
        };
        let family = family.to_lowercase();
        if family.is_empty() {
            return None;
        }
        let hyphenated = hyphenate(&family);
        let size = size.filter(|s| !s.is_empty());

        let mut best: Option<(&CatalogEntry, f64)> = None;
        let mut considered = 0usize;
        for entry in catalog {
            let bare = bare_name(&entry.id);
            if !contains_token(&bare, &hyphenated) && !contains_token(&bare, &family) {
                continue;
            }
            if let Some(size) = &size
                && !contains_token(&bare, size)
            {
                continue;
            }
            considered += 1;
            let score = local_score(entry, &bare);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((entry, score));
            }
        }

        let (entry, score) = best?;
        if let Some(min) = self.policy.local_min_score
            && score < min
        {
            debug!(identifier, candidate = %entry.id, score, min, "local match below threshold");
            return None;
        }
        debug!(identifier, matched = %entry.id, score, considered, "local fuzzy match");
        Some(entry)
    }
}

fn local_score(entry: &CatalogEntry, bare: &str) -> f64 {
    let mut score = 0.0;
    if bare
        .split(is_separator)
        .any(|token| matches!(token, "instruct" | "it" | "chat"))
    {
        score += 2.0;
    }
    if !entry.id.contains(":free") {
        score += 1.0;
    }
    score - bare.len() as f64 * 0.01
}

fn is_separator(c: char) -> bool {
    matches!(c, '-' | '_' | '/' | ':' | '.' | ' ')
}

/// Whether `needle` occurs in `haystack` with a separator (or string edge)
/// on both sides. A `.` counts as a right-hand boundary only, so `llama-3`
/// matches `llama-3.1` but `5b` does not match `0.5b`.
fn contains_token(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let left_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| is_separator(c) && c != '.');
        let right_ok = haystack[end..].chars().next().is_none_or(is_separator);
        left_ok && right_ok
    })
}
