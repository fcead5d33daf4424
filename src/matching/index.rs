//! Candidate-key index over one source's records.
//!
//! An [`Index`] is a multimap from lookup key to record, built once per
//! source per reconciliation pass. Each key is registered with a
//! [`KeyRank`]; when several records claim the same key, the best rank wins
//! and ties go to the record inserted first. This lets a record's exact name
//! outrank a derived key that an earlier record happened to produce.

use std::collections::{BTreeMap, HashMap};

use super::normalize::{bare_name, normalize};
use crate::types::{CatalogEntry, LeaderboardEntry, PricingEntry};

/// How a key was derived from its record. Lower ranks win lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyRank {
    /// The record's own identifier (or its lowercase form).
    Exact,
    /// The normalized identifier.
    Normalized,
    /// Any further heuristic variant.
    Derived,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    record: usize,
    rank: KeyRank,
}

/// Lookup index from candidate key to record.
#[derive(Debug, Clone)]
pub struct Index<T> {
    records: Vec<T>,
    slots: HashMap<String, Vec<Slot>>,
    /// Keys in first-registration order, for deterministic scans.
    order: Vec<String>,
}

impl<T> Default for Index<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            slots: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T> Index<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from records and a key generator.
    pub fn build<I, F>(records: I, keys_of: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> Vec<(String, KeyRank)>,
    {
        let mut index = Self::new();
        for record in records {
            let keys = keys_of(&record);
            index.insert(record, keys);
        }
        index
    }

    /// Add a record under the given keys. Empty keys are ignored.
    pub fn insert(&mut self, record: T, keys: Vec<(String, KeyRank)>) {
        let position = self.records.len();
        self.records.push(record);
        for (key, rank) in keys {
            if key.is_empty() {
                continue;
            }
            let slots = self.slots.entry(key.clone()).or_insert_with(|| {
                self.order.push(key);
                Vec::new()
            });
            if !slots.iter().any(|s| s.record == position) {
                slots.push(Slot {
                    record: position,
                    rank,
                });
            }
        }
    }

    /// Best record registered under `key`.
    pub fn get(&self, key: &str) -> Option<&T> {
        let slot = self.slots.get(key)?.iter().min_by_key(|s| s.rank)?;
        self.records.get(slot.record)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Keys in first-registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Keys for an identifier-addressed record: the id, its lowercase form,
/// its normalized form and its bare name.
pub fn identifier_keys(id: &str) -> Vec<(String, KeyRank)> {
    vec![
        (id.to_string(), KeyRank::Exact),
        (id.to_lowercase(), KeyRank::Exact),
        (normalize(id), KeyRank::Normalized),
        (bare_name(id), KeyRank::Derived),
    ]
}

/// Keys for a leaderboard display name.
///
/// Covers the lowercase name plus date-stripped, qualifier-stripped,
/// parenthetical-stripped and dots-to-dashes variants.
pub fn display_name_keys(display_name: &str) -> Vec<(String, KeyRank)> {
    let name = display_name.trim().to_lowercase();
    if name.is_empty() {
        return Vec::new();
    }

    let mut keys = vec![(name.clone(), KeyRank::Exact)];
    let mut derive = |variant: String| {
        if variant != name {
            keys.push((variant, KeyRank::Derived));
        }
    };

    derive(strip_dates(&name));
    derive(normalize(&name));
    derive(strip_quantization(&normalize(&name)));
    derive(strip_parenthetical(&name));
    let dashed = name.replace('.', "-");
    derive(strip_dates(&dashed));
    derive(dashed);

    keys
}

fn strip_dates(name: &str) -> String {
    let name = strip_suffix_digits(name, &[4, 2, 2]);
    let name = strip_suffix_digits(&name, &[8]);
    strip_suffix_digits(&name, &[4])
}

/// Strip a trailing `-d..d[-d..d]*` group whose segment widths match `widths`.
fn strip_suffix_digits(name: &str, widths: &[usize]) -> String {
    let mut rest = name;
    for width in widths.iter().rev() {
        let Some((head, tail)) = rest.rsplit_once('-') else {
            return name.to_string();
        };
        if tail.len() != *width || !tail.bytes().all(|b| b.is_ascii_digit()) {
            return name.to_string();
        }
        rest = head;
    }
    rest.to_string()
}

fn strip_quantization(name: &str) -> String {
    name.strip_suffix("-bf16")
        .or_else(|| name.strip_suffix("-fp8"))
        .unwrap_or(name)
        .to_string()
}

/// `"gemini-3-flash (thinking-minimal)"` → `"gemini-3-flash"`.
fn strip_parenthetical(name: &str) -> String {
    match (name.find('('), name.ends_with(')')) {
        (Some(open), true) => name[..open].trim().to_string(),
        _ => name.to_string(),
    }
}

/// Catalog index keyed by [`identifier_keys`].
pub fn catalog_index(entries: &[CatalogEntry]) -> Index<&CatalogEntry> {
    Index::build(entries, |entry| identifier_keys(&entry.id))
}

/// Pricing-table index keyed by [`identifier_keys`] of the table key.
pub fn pricing_index(table: &BTreeMap<String, PricingEntry>) -> Index<(&str, &PricingEntry)> {
    Index::build(
        table.iter().map(|(id, entry)| (id.as_str(), entry)),
        |(id, _)| identifier_keys(id),
    )
}

/// Leaderboard index keyed by [`display_name_keys`].
pub fn leaderboard_index(entries: &[LeaderboardEntry]) -> Index<&LeaderboardEntry> {
    Index::build(entries, |entry| display_name_keys(&entry.display_name))
}
