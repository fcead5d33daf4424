//! Identifier normalization and cross-source matching.
//!
//! [`normalize`] turns raw identifiers into canonical forms and candidate
//! keys, [`index`] builds per-source lookup indices over those keys, and
//! [`matcher`] decides which record in another source describes the same
//! model.

pub mod index;
pub mod matcher;
pub mod normalize;

pub use index::{Index, KeyRank, catalog_index, leaderboard_index, pricing_index};
pub use matcher::{MatchPolicy, Matcher};
pub use normalize::{aggressive, bare_name, candidate_keys, extract_provider, hyphenate, normalize};
