//! # gencache-core
//!
//! Deterministic content rules for the gencache generation engine.
//!
//! This crate holds everything about generated content that does not touch
//! the network:
//! - Relevance scoring of generated HTML against the originating query
//! - Normalization of raw provider output into article markup
//! - Metadata derivation and placeholder markup
//! - Idea list parsing and the deterministic default list
//! - Cache key derivation
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No I/O**: Nothing here sleeps, blocks or calls a provider
//! 3. **Never empty**: Every [`GenerationResult`] built here has non-empty HTML
//!
//! ## Example
//!
//! ```rust
//! use gencache_core::{sanitize_article, KeywordRelevance, RelevanceCheck};
//!
//! let html = sanitize_article("```html\n<article><h1>Rust ownership</h1></article>\n```");
//! assert_eq!(html, "<article><h1>Rust ownership</h1></article>");
//!
//! let validator = KeywordRelevance::default();
//! assert!(validator.is_relevant("rust ownership", &html));
//! ```

pub mod ideas;
pub mod key;
pub mod meta;
pub mod placeholder;
pub mod relevance;
pub mod sanitize;
pub mod types;

// Re-export main types at crate root
pub use ideas::{default_ideas, parse_idea_list, IdeaParseError};
pub use key::{content_cache_key, idea_cache_key};
pub use meta::{derive_meta, DerivedMeta};
pub use placeholder::Placeholder;
pub use relevance::{query_tokens, DriftRule, KeywordRelevance, RelevanceCheck};
pub use sanitize::{sanitize_article, SanitizeRule, SANITIZE_RULES};
pub use types::{GenerationResult, IdeaItem, IdeaList, MAX_IDEAS};
