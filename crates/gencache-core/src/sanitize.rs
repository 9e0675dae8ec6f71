//! Normalization of raw provider text into article markup.
//!
//! Rules run in the order of [`SANITIZE_RULES`]. Later rules assume earlier
//! ones already ran: tag extraction expects fences and preambles gone, and
//! heading anchoring only runs when no tagged region was found.

use std::ops::ControlFlow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LEADING_FENCE: Regex = Regex::new(r"^```[a-zA-Z]*\s*").unwrap();
    static ref TRAILING_FENCE: Regex = Regex::new(r"```\s*$").unwrap();
    static ref INNER_FENCE: Regex = Regex::new(r"```[a-zA-Z]*\s*").unwrap();

    /// Conversational openers, each consumed up to the first tag.
    static ref PREAMBLES: Vec<Regex> = vec![
        Regex::new(r"(?i)^Absolutely![^<]*<\s*").unwrap(),
        Regex::new(r"(?i)^Sure\s*,?[^<]*<\s*").unwrap(),
    ];

    static ref ARTICLE_REGION: Regex = Regex::new(r"(?is)<article.*?</article>").unwrap();
}

/// Opening of the primary content tag.
pub const CONTENT_TAG_OPEN: &str = "<article";

/// Heading marker used when no tagged region exists.
pub const HEADING_MARKER: &str = "<h1";

/// One normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeRule {
    /// Remove code-fence markers anywhere in the text
    StripFences,
    /// Remove a chatty opener before the first tag
    StripPreambles,
    /// Keep only the first `<article>...</article>` region, ending the pipeline
    ExtractTagged,
    /// Keep from the first `<h1` onward
    AnchorHeading,
}

/// Rule order. Do not reorder.
pub const SANITIZE_RULES: [SanitizeRule; 4] = [
    SanitizeRule::StripFences,
    SanitizeRule::StripPreambles,
    SanitizeRule::ExtractTagged,
    SanitizeRule::AnchorHeading,
];

impl SanitizeRule {
    /// Apply the rule. `Break` ends the pipeline with its value.
    pub fn apply(self, text: String) -> ControlFlow<String, String> {
        match self {
            SanitizeRule::StripFences => {
                let t = LEADING_FENCE.replace(text.trim(), "");
                let t = TRAILING_FENCE.replace(&t, "");
                let t = INNER_FENCE.replace_all(&t, "");
                ControlFlow::Continue(t.replace("```", ""))
            }
            SanitizeRule::StripPreambles => {
                let stripped = PREAMBLES
                    .iter()
                    .fold(text, |t, re| re.replace(&t, "<").into_owned());
                ControlFlow::Continue(stripped)
            }
            SanitizeRule::ExtractTagged => match ARTICLE_REGION.find(&text) {
                Some(m) => ControlFlow::Break(m.as_str().to_string()),
                None => ControlFlow::Continue(text),
            },
            SanitizeRule::AnchorHeading => match text.find(HEADING_MARKER) {
                Some(idx) => ControlFlow::Continue(text[idx..].to_string()),
                None => ControlFlow::Continue(text),
            },
        }
    }
}

/// Run every rule in order over the raw text.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_string();
    for rule in SANITIZE_RULES {
        match rule.apply(text) {
            ControlFlow::Continue(next) => text = next,
            ControlFlow::Break(done) => return done,
        }
    }
    text
}

/// Normalize provider text and wrap it in the primary content tag.
///
/// Returns an empty string when nothing usable remains.
pub fn sanitize_article(raw: &str) -> String {
    let cleaned = normalize(raw);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return String::new();
    }
    if starts_with_content_tag(cleaned) {
        cleaned.to_string()
    } else {
        format!("<article>{cleaned}</article>")
    }
}

fn starts_with_content_tag(text: &str) -> bool {
    text.get(..CONTENT_TAG_OPEN.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(CONTENT_TAG_OPEN))
}
