//! Prompts sent to text-generation providers.
//!
//! Article prompts ask for bare HTML starting with `<article>`; the idea
//! prompt asks for a JSON array. Provider output is still sanitized and
//! parsed leniently; these prompts only make the common case clean.

use crate::providers::GenerationRequest;

/// System instruction for JSON-only responses.
pub const IDEAS_SYSTEM_PROMPT: &str = "You output strictly JSON when asked.";

/// Which prompt a generation pass uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// First article pass
    Standard,
    /// Single regeneration pass after an off-topic result
    Strict,
    /// Idea list
    Ideas,
}

impl PromptKind {
    pub fn temperature(&self) -> f32 {
        match self {
            PromptKind::Standard => 0.7,
            PromptKind::Strict => 0.3,
            PromptKind::Ideas => 0.4,
        }
    }

    pub fn render(&self, query: &str, locale: &str) -> String {
        match self {
            PromptKind::Standard => article_prompt(query, locale),
            PromptKind::Strict => strict_article_prompt(query, locale),
            PromptKind::Ideas => ideas_prompt(query, locale),
        }
    }

    /// Full request for `model`.
    pub fn request(&self, model: &str, query: &str, locale: &str) -> GenerationRequest {
        let request = GenerationRequest::new(model, self.render(query, locale))
            .with_temperature(self.temperature());
        match self {
            PromptKind::Ideas => request.with_system(IDEAS_SYSTEM_PROMPT),
            _ => request,
        }
    }
}

pub fn article_prompt(query: &str, locale: &str) -> String {
    format!(
        "You are a content generator. Respond ONLY with valid HTML for an article about \"{query}\" in locale \"{locale}\". \
         Do not include explanations, prefaces, or code fences. \
         Output must start with <article> and contain headings (h1-h3), and include natural related search terms. \
         Avoid harmful or copyrighted content."
    )
}

pub fn strict_article_prompt(query: &str, locale: &str) -> String {
    format!(
        "You MUST generate an article ONLY about \"{query}\" in locale \"{locale}\". \
         Respond strictly with valid HTML starting with <article>. \
         Do not include any explanations, prefaces, or code fences. \
         Include headings (h1-h3) and natural related search terms for \"{query}\"."
    )
}

pub fn ideas_prompt(query: &str, locale: &str) -> String {
    format!(
        "You are a helpful assistant. Given the query \"{query}\" and locale \"{locale}\", \
         output a JSON array of 6 relevant article ideas. \
         Each item must be an object: {{\"title\": string, \"query\": string, \"description\": string}}. \
         The ideas must be highly relevant to the query. \
         Avoid career/salary unless obviously applicable. Return ONLY JSON."
    )
}
