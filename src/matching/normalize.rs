//! Identifier normalization and candidate-key generation.
//!
//! Every source spells model identifiers differently: date suffixes
//! (`gpt-4o-2024-05-13`, `claude-3-5-sonnet-20241022`), region and vendor
//! prefixes (`us.anthropic.claude-...`), locally-run tags (`llama3:8b`) and
//! `.`/`-` separator drift (`gpt-4.1` vs `gpt-4-1`). The functions here are
//! pure and deterministic; they never touch network state.
//!
//! Normalization is expressed as ordered rule tables of
//! `(pattern, replacement)` pairs. Adding a naming convention means adding a
//! row, not a branch.

use std::sync::LazyLock;

use regex::Regex;

/// A single rewrite step.
struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

fn compile(table: &[(&str, &'static str)]) -> Vec<Rule> {
    table
        .iter()
        .map(|&(pattern, replacement)| Rule {
            pattern: Regex::new(pattern).expect("rule patterns are valid literals"),
            replacement,
        })
        .collect()
}

/// Apply every rule once, in order.
fn apply(rules: &[Rule], input: &str) -> String {
    rules.iter().fold(input.to_string(), |acc, rule| {
        rule.pattern.replace_all(&acc, rule.replacement).into_owned()
    })
}

/// Region and vendor prefixes on the final path segment
/// (`us.anthropic.claude-...` → `claude-...`).
static PREFIX_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (r"^(us|eu|apac|global)\.", ""),
        (r"^(anthropic|meta|amazon|cohere|mistral|ai21)\.", ""),
    ])
});

/// Suffixes stripped by [`normalize`]. Order matters: `-preview` is only
/// trailing once the date after it is gone.
static SUFFIX_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (r":free$", ""),
        (r":extended$", ""),
        (r"-v\d+:\d+$", ""),
        (r"-\d{4}-\d{2}(-\d{2})?$", ""),
        (r"-\d{8}$", ""),
        (r"-\d{4}$", ""),
        (r"-preview$", ""),
        (r"-latest$", ""),
        (r"-instruct$", ""),
        (r"-chat$", ""),
    ])
});

/// Extra qualifiers removed by [`aggressive`] on top of [`normalize`].
static AGGRESSIVE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (r"-hf$", ""),
        (r"-online$", ""),
        (r"-\d{4}$", ""),
        (r"-exp$", ""),
        (r"-0\d{2}$", ""),
    ])
});

/// Bedrock version suffix and locally-run size tag, stripped from bare names.
static BARE_SUFFIX_RULES: LazyLock<Vec<Rule>> =
    LazyLock::new(|| compile(&[(r"-v\d+:\d+$", ""), (r":\w+$", "")]));

/// Letter/digit boundaries get a hyphen (`gemma3` → `gemma-3`).
static HYPHENATE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    compile(&[
        (r"([a-z])(\d)", "${1}-${2}"),
        (r"(\d)([a-z])", "${1}-${2}"),
    ])
});

static DATE8: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{8}$").expect("literal pattern"));
static DATE4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{4}$").expect("literal pattern"));

/// `name-variant-version` (e.g. `claude-sonnet-4.5`).
static VARIANT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)-([a-z]+)-(\d+[.\d]*)$").expect("literal pattern"));
/// `name-version-variant` (e.g. `claude-4.5-sonnet`).
static VERSION_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)-(\d+[.\d]*)-([a-z]+)$").expect("literal pattern"));

/// Split `provider/.../name` into `("provider/.../", "name")`.
fn split_path(id: &str) -> (&str, &str) {
    match id.rfind('/') {
        Some(idx) => id.split_at(idx + 1),
        None => ("", id),
    }
}

/// Provider part of an identifier (`openai/gpt-4o` → `openai`), or
/// `"unknown"` when there is no path separator.
pub fn extract_provider(id: &str) -> String {
    match id.split_once('/') {
        Some((provider, _)) if !provider.is_empty() => provider.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Canonical form of an identifier.
///
/// Lowercases, strips region/vendor-dotted prefixes from the final path
/// segment, then strips date suffixes (`-YYYY-MM[-DD]`, 8- and 4-digit
/// trailing numbers) and qualifiers (`-preview`, `-latest`, `-instruct`,
/// `-chat`, `:free`, `:extended`, Bedrock `-vN:M`). The provider path is kept.
pub fn normalize(id: &str) -> String {
    let lower = id.to_lowercase();
    let (path, name) = split_path(&lower);
    let name = apply(&SUFFIX_RULES, &apply(&PREFIX_RULES, name));
    format!("{path}{name}")
}

/// Final path segment, lowercased, without region/vendor prefixes, Bedrock
/// version suffix or `:tag`.
pub fn bare_name(id: &str) -> String {
    let lower = id.to_lowercase();
    let (_, name) = split_path(&lower);
    apply(&BARE_SUFFIX_RULES, &apply(&PREFIX_RULES, name))
}

/// [`normalize`] plus removal of secondary qualifiers (`-hf`, `-online`,
/// `-exp`, short revision numbers) and `.` → `-`.
pub fn aggressive(name: &str) -> String {
    apply(&AGGRESSIVE_RULES, &normalize(name)).replace('.', "-")
}

/// Insert hyphens at letter/digit boundaries. Expects lowercase input.
pub fn hyphenate(name: &str) -> String {
    apply(&HYPHENATE_RULES, name)
}

/// Ordered, de-duplicated candidate keys for cross-source lookup.
///
/// Preference order: the bare name, its normalized form, the aggressively
/// stripped form, separator and hyphenation variants, locally-run tag
/// expansions (`family:size` → `family-size[-it|-instruct]`), date-stripped
/// forms, and finally version-reordering variants
/// (`name-variant-version` ↔ `name-version-variant`).
pub fn candidate_keys(id: &str) -> Vec<String> {
    let mut keys = CandidateKeys::default();

    let bare = bare_name(id);
    let normalized = normalize(&bare);
    keys.push(bare.clone());
    keys.push(normalized.clone());
    keys.push(aggressive(&bare));

    for variant in [&bare, &normalized] {
        keys.push(variant.replace('.', "-"));
        keys.push(variant.replace('-', "."));
    }

    let hyphenated = hyphenate(&bare);
    if hyphenated != bare {
        keys.push(aggressive(&hyphenated));
        keys.push(hyphenated);
    }

    let (_, tail) = split_path(id);
    if let Some((family, tag)) = tail.split_once(':') {
        let family = hyphenate(&family.to_lowercase());
        let tag = tag.to_lowercase();
        keys.push(format!("{family}-{tag}"));
        keys.push(format!("{family}-{tag}-it"));
        keys.push(format!("{family}-{tag}-instruct"));
    }

    keys.push(DATE8.replace(&bare, "").into_owned());
    keys.push(DATE4.replace(&bare, "").into_owned());

    if let Some(caps) = VARIANT_VERSION.captures(&bare) {
        let (name, variant, version) = (&caps[1], &caps[2], &caps[3]);
        keys.push(format!("{name}-{version}-{variant}"));
        keys.push(format!("{name}-{}-{variant}", version.replace('.', "-")));
    }
    if let Some(caps) = VERSION_VARIANT.captures(&bare) {
        let (name, version, variant) = (&caps[1], &caps[2], &caps[3]);
        keys.push(format!("{name}-{variant}-{version}"));
        keys.push(format!("{name}-{variant}-{}", version.replace('.', "-")));
    }

    keys.into_vec()
}

/// Insertion-ordered set of non-empty keys.
#[derive(Default)]
struct CandidateKeys(Vec<String>);

impl CandidateKeys {
    fn push(&mut self, key: String) {
        if !key.is_empty() && !self.0.contains(&key) {
            self.0.push(key);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.0
    }
}
