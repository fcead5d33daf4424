//! LMArena leaderboards.
//!
//! The leaderboard pages are Next.js server-rendered HTML. Rows live in the
//! page's flight payloads, `self.__next_f.push([1,"<js string>"])`, as flat
//! JSON objects carrying `modelDisplayName` and `rating`. We unescape every
//! payload, scan it for such objects, then scan the raw HTML as well for
//! rows rendered outside the flight stream.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::info;

use super::{LeaderboardSource, check_status, http_client, lenient};
use crate::cache::SourceCache;
use crate::types::LeaderboardEntry;
use crate::{MimirError, Result};

pub(crate) const DEFAULT_BASE_URL: &str = "https://arena.ai";
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(1800);
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const BROWSER_AGENT: &str = "Mozilla/5.0 (compatible; ModelStats/1.0)";

const PUSH_PREFIX: &str = r#"self.__next_f.push([1,""#;

static ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{[^{}]*?"modelDisplayName"\s*:\s*"([^"]+?)"[^{}]*?"rating"\s*:\s*([\d.]+)[^{}]*?\}"#,
    )
    .expect("literal pattern")
});
static RANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""rank"\s*:\s*(\d+)"#).expect("literal pattern"));
static RATING_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""ratingUpper"\s*:\s*([\d.]+)"#).expect("literal pattern"));
static RATING_LOWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""ratingLower"\s*:\s*([\d.]+)"#).expect("literal pattern"));
static VOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""votes"\s*:\s*(\d+)"#).expect("literal pattern"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRow {
    model_display_name: String,
    rating: f64,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    rating_upper: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    rating_lower: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    rank: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    votes: Option<u64>,
}

/// Cache key for one category (`lmarena_text`, `lmarena_web_dev`, ...).
pub(crate) fn cache_key(category: &str) -> String {
    format!("lmarena_{}", category.replace('-', "_"))
}

/// Extract leaderboard rows for `category` from a leaderboard page.
///
/// Missing confidence bounds default to the rating, missing rank and votes
/// to zero. A display name seen twice keeps its first row.
pub fn parse_leaderboard_html(html: &str, category: &str) -> Vec<LeaderboardEntry> {
    let mut rows = Rows {
        category,
        entries: Vec::new(),
        seen: HashSet::new(),
    };
    for payload in flight_payloads(html) {
        rows.extract(&payload);
    }
    rows.extract(html);
    rows.entries
}

/// Unescaped string arguments of every `self.__next_f.push([1,"..."])`.
fn flight_payloads(html: &str) -> Vec<String> {
    let bytes = html.as_bytes();
    let mut payloads = Vec::new();
    let mut from = 0;

    while let Some(offset) = html[from..].find(PUSH_PREFIX) {
        let start = from + offset + PUSH_PREFIX.len();
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => break,
                _ => i += 1,
            }
        }
        let end = i.min(bytes.len());
        payloads.push(unescape_js(&html[start..end]));
        from = (end + 1).min(html.len());
    }
    payloads
}

fn unescape_js(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| {
        raw.replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\\\", "\\")
    })
}

struct Rows<'a> {
    category: &'a str,
    entries: Vec<LeaderboardEntry>,
    seen: HashSet<String>,
}

impl Rows<'_> {
    fn extract(&mut self, text: &str) {
        for caps in ROW.captures_iter(text) {
            let name = &caps[1];
            if self.seen.contains(name) {
                continue;
            }
            let object = &caps[0];
            let entry = match serde_json::from_str::<WireRow>(object) {
                Ok(row) => Some(self.entry_from_wire(row)),
                Err(_) => self.entry_from_fields(name, &caps[2], object),
            };
            if let Some(entry) = entry
                && self.seen.insert(entry.display_name.clone())
            {
                self.entries.push(entry);
            }
        }
    }

    fn entry_from_wire(&self, row: WireRow) -> LeaderboardEntry {
        LeaderboardEntry {
            category: self.category.to_string(),
            rating_upper: row.rating_upper.unwrap_or(row.rating),
            rating_lower: row.rating_lower.unwrap_or(row.rating),
            rank: clamp_rank(row.rank.unwrap_or(0)),
            votes: row.votes.unwrap_or(0),
            display_name: row.model_display_name,
            rating: row.rating,
        }
    }

    /// Field-by-field fallback for objects that are not valid JSON on
    /// their own.
    fn entry_from_fields(
        &self,
        name: &str,
        rating: &str,
        object: &str,
    ) -> Option<LeaderboardEntry> {
        let rating: f64 = rating.parse().ok()?;
        let capture = |re: &Regex| re.captures(object).map(|c| c[1].to_string());
        Some(LeaderboardEntry {
            category: self.category.to_string(),
            display_name: name.to_string(),
            rating,
            rating_upper: capture(&RATING_UPPER)
                .and_then(|v| v.parse().ok())
                .unwrap_or(rating),
            rating_lower: capture(&RATING_LOWER)
                .and_then(|v| v.parse().ok())
                .unwrap_or(rating),
            rank: capture(&RANK)
                .and_then(|v| v.parse::<u64>().ok())
                .map(clamp_rank)
                .unwrap_or(0),
            votes: capture(&VOTES).and_then(|v| v.parse().ok()).unwrap_or(0),
        })
    }
}

fn clamp_rank(rank: u64) -> u32 {
    u32::try_from(rank).unwrap_or(u32::MAX)
}

/// Leaderboard adapter scraping the LMArena web pages.
#[derive(Clone)]
pub struct LmArenaLeaderboard {
    http: Client,
    base_url: String,
    cache: Arc<SourceCache>,
    ttl: Duration,
}

impl LmArenaLeaderboard {
    pub fn new(cache: Arc<SourceCache>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, cache)
    }

    /// Create an adapter against a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>, cache: Arc<SourceCache>) -> Result<Self> {
        Ok(Self {
            http: http_client(DEFAULT_TIMEOUT)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache,
            ttl: DEFAULT_TTL,
        })
    }

    /// How long a fetched category is served from cache. Default: 1800 s.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Per-request HTTP timeout. Default: 20 s.
    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = http_client(timeout)?;
        Ok(self)
    }
}

#[async_trait]
impl LeaderboardSource for LmArenaLeaderboard {
    fn name(&self) -> &str {
        "lmarena"
    }

    async fn fetch(&self, category: &str) -> Result<Vec<LeaderboardEntry>> {
        let key = cache_key(category);
        if let Some(entries) = self.cache.get::<Vec<LeaderboardEntry>>(&key)? {
            return Ok(entries);
        }

        let url = format!("{}/leaderboard/{category}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "text/html")
            .header(USER_AGENT, BROWSER_AGENT)
            .send()
            .await?;
        check_status(&response, "lmarena leaderboard")?;
        let html = response.text().await?;

        let entries = parse_leaderboard_html(&html, category);
        if entries.is_empty() {
            return Err(MimirError::EmptySource(format!(
                "no entries parsed from LMArena {category} page"
            )));
        }
        self.cache.set(key, entries.clone(), self.ttl);
        info!(category, count = entries.len(), "fetched LMArena leaderboard");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flight_payload_rows() {
        let html = concat!(
            r#"<html><script>self.__next_f.push([1,"3:[{\"rank\":1,\"modelDisplayName\":\"gemini-2.5-pro\","#,
            r#"\"rating\":1460.5,\"ratingUpper\":1465.1,\"ratingLower\":1455.9,\"votes\":12034},"#,
            r#"{\"rank\":2,\"modelDisplayName\":\"gpt-4o-2024-05-13\",\"rating\":1285}]"])</script></html>"#,
        );
        let entries = parse_leaderboard_html(html, "text");
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.display_name, "gemini-2.5-pro");
        assert_eq!(first.category, "text");
        assert_eq!(first.rank, 1);
        assert_eq!(first.votes, 12_034);
        assert!((first.rating_upper - 1465.1).abs() < 1e-9);

        let second = &entries[1];
        assert_eq!(second.rating, 1285.0);
        assert_eq!(second.rating_upper, 1285.0);
        assert_eq!(second.rating_lower, 1285.0);
        assert_eq!(second.votes, 0);
    }

    #[test]
    fn raw_html_rows_and_duplicates() {
        let html = r#"
            <script id="__NEXT_DATA__">{"rows":[
              {"modelDisplayName":"claude-opus-4","rating":1420,"rank":3},
              {"modelDisplayName":"claude-opus-4","rating":1000,"rank":9}
            ]}</script>"#;
        let entries = parse_leaderboard_html(html, "code");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rating, 1420.0);
        assert_eq!(entries[0].rank, 3);
    }

    #[test]
    fn falls_back_to_field_regexes_for_invalid_json() {
        let html = r#"{"modelDisplayName":"o3","rating":1411.2,"votes":88,"extra":undefined}"#;
        let entries = parse_leaderboard_html(html, "text");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name, "o3");
        assert_eq!(entries[0].votes, 88);
        assert_eq!(entries[0].rating_lower, 1411.2);
    }

    #[test]
    fn page_without_rows_is_empty() {
        let html = "<html><body>maintenance</body></html>";
        assert!(parse_leaderboard_html(html, "vision").is_empty());
    }

    #[test]
    fn cache_keys_are_per_category() {
        assert_eq!(cache_key("text"), "lmarena_text");
        assert_eq!(cache_key("web-dev"), "lmarena_web_dev");
    }
}
