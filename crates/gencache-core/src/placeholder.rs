//! Deterministic placeholder markup.
//!
//! Placeholders are returned when no provider content can be accepted. They
//! embed the query, so they are exempt from relevance checks.

/// Why a placeholder was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// No provider credential is configured
    MissingCredentials,

    /// Every configured provider is inside a suppression window
    RateLimited { retry_in_secs: u64 },

    /// Every provider and fallback model failed
    ProviderError,

    /// Generated content failed relevance twice
    OffTopic,
}

impl Placeholder {
    /// Render the placeholder article.
    pub fn render(self, query: &str, locale: &str) -> String {
        let q = escape_html(query);
        let l = escape_html(locale);
        match self {
            Placeholder::MissingCredentials => format!(
                "<article><h1>{q}</h1><p>Locale: {l}</p><p>AI key missing, showing placeholder content.</p></article>"
            ),
            Placeholder::RateLimited { retry_in_secs } => format!(
                "<article><h1>{q}</h1><p>Locale: {l}</p><p>Provider rate limit ({retry_in_secs}s); showing placeholder.</p></article>"
            ),
            Placeholder::ProviderError => format!(
                "<article><h1>{q}</h1><p>Locale: {l}</p><p>Content service error; showing placeholder.</p></article>"
            ),
            Placeholder::OffTopic => format!(
                "<article><h1>{q}</h1><p>Generated content unavailable or off-topic; showing placeholder targeted to your query.</p></article>"
            ),
        }
    }
}

/// Escape the characters that would let a query break out of markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
