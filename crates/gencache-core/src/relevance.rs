//! Relevance scoring of generated content.
//!
//! A best-effort anchor check: content must mention at least one meaningful
//! query token and must not drift into a known off-topic category. False
//! positives and negatives are expected.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// First-level heading, case-insensitive, may span lines.
    static ref H1_PATTERN: Regex = Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap();
}

/// Tokens shorter than this are too noisy to anchor relevance.
pub const MIN_TOKEN_LEN: usize = 4;

/// Decides whether content still matches the query it was generated for.
///
/// The orchestrators call this on every cache read and after every
/// generation. Swap the implementation to tighten or loosen the check.
pub trait RelevanceCheck: Send + Sync {
    fn is_relevant(&self, query: &str, content: &str) -> bool;
}

/// A topic-drift category.
///
/// Content containing any of `phrases` is rejected unless some query token
/// contains `exempt_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftRule {
    pub phrases: Vec<String>,
    pub exempt_token: String,
}

impl DriftRule {
    pub fn new<I, S>(phrases: I, exempt_token: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
            exempt_token: exempt_token.into().to_lowercase(),
        }
    }

    /// Career content tends to leak into unrelated articles.
    pub fn career() -> Self {
        Self::new(
            ["web developer", "web development", "career path", "salary"],
            "developer",
        )
    }

    fn is_drift(&self, tokens: &[String], text: &str) -> bool {
        self.phrases.iter().any(|p| text.contains(p.as_str()))
            && !tokens.iter().any(|t| t.contains(self.exempt_token.as_str()))
    }
}

/// Keyword-anchored relevance with a drift denylist.
#[derive(Debug, Clone)]
pub struct KeywordRelevance {
    drift_rules: Vec<DriftRule>,
}

impl KeywordRelevance {
    pub fn new(drift_rules: Vec<DriftRule>) -> Self {
        Self { drift_rules }
    }

    /// Validator with no drift denylist.
    pub fn anchors_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn drift_rules(&self) -> &[DriftRule] {
        &self.drift_rules
    }
}

impl Default for KeywordRelevance {
    fn default() -> Self {
        Self::new(vec![DriftRule::career()])
    }
}

impl RelevanceCheck for KeywordRelevance {
    fn is_relevant(&self, query: &str, content: &str) -> bool {
        let tokens = query_tokens(query);
        let text = content.to_lowercase();

        let h1_text = H1_PATTERN
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or("");

        let anchored = tokens
            .iter()
            .any(|t| text.contains(t.as_str()) || h1_text.contains(t.as_str()));

        let drifted = self
            .drift_rules
            .iter()
            .any(|rule| rule.is_drift(&tokens, &text));

        anchored && !drifted
    }
}

/// Lowercased query tokens split on non-alphanumeric boundaries, keeping
/// those of at least [`MIN_TOKEN_LEN`] characters.
///
/// Letters and digits from any script count, and length is measured in
/// chars rather than bytes.
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}
