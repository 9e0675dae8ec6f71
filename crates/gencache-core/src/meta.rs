//! Metadata derivation from article markup.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref H1_PATTERN: Regex = Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap();
    static ref P_PATTERN: Regex = Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").unwrap();
    static ref TAG_PATTERN: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Longest derived description, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 160;

/// Title and description derived from markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedMeta {
    pub title: String,
    pub description: String,
}

/// Derive a title from the first heading and a description from the first
/// paragraph, falling back to query-based text when either is missing or too
/// short to be useful.
pub fn derive_meta(html: &str, query: &str, locale: &str) -> DerivedMeta {
    let heading = first_capture(&H1_PATTERN, html).map(strip_tags);
    let title = match heading {
        Some(h) if h.chars().count() > 3 => h,
        _ => format!("{query} - Article"),
    };

    let paragraph = first_capture(&P_PATTERN, html);
    let description = match paragraph {
        Some(p) if p.chars().count() > 20 => strip_tags(p)
            .chars()
            .take(DESCRIPTION_MAX_CHARS)
            .collect(),
        _ => format!("Generated content for {query} in {locale}."),
    };

    DerivedMeta { title, description }
}

fn first_capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn strip_tags(text: &str) -> String {
    TAG_PATTERN.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_from_markup() {
        let html = "<article><h1> Growing <em>basil</em> </h1><p>Basil grows best with <b>warmth</b> and daily sun.</p></article>";
        let meta = derive_meta(html, "basil", "en_US");
        assert_eq!(meta.title, "Growing basil");
        assert_eq!(meta.description, "Basil grows best with warmth and daily sun.");
    }

    #[test]
    fn test_meta_fallbacks() {
        let meta = derive_meta("<article><h1>Hi</h1><p>Short.</p></article>", "basil", "de_DE");
        assert_eq!(meta.title, "basil - Article");
        assert_eq!(meta.description, "Generated content for basil in de_DE.");
    }

    #[test]
    fn test_description_truncated() {
        let long = "word ".repeat(100);
        let html = format!("<article><h1>Long read</h1><p>{long}</p></article>");
        let meta = derive_meta(&html, "long", "en_US");
        assert_eq!(meta.description.chars().count(), DESCRIPTION_MAX_CHARS);
    }

    #[test]
    fn test_pre_is_not_a_paragraph() {
        let html = "<article><pre>fn main() { println!(\"hello world\"); }</pre></article>";
        let meta = derive_meta(html, "rust", "en_US");
        assert_eq!(meta.description, "Generated content for rust in en_US.");
    }
}
