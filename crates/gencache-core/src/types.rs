//! Data model shared by the orchestrators.

use serde::{Deserialize, Serialize};

use crate::meta::derive_meta;
use crate::placeholder::Placeholder;

/// Maximum number of ideas in an [`IdeaList`].
pub const MAX_IDEAS: usize = 6;

/// Generated article content.
///
/// `html` is never empty. Metadata may be absent while a result is being
/// assembled, but [`GenerationResult::with_derived_meta`] fills both fields
/// before anything is cached or returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Article markup
    pub html: String,

    /// Page title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,

    /// Page description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
}

impl GenerationResult {
    /// Wrap accepted article markup.
    ///
    /// Returns `None` for empty or whitespace-only markup so an empty payload
    /// can never be stored.
    pub fn from_html(html: impl Into<String>) -> Option<Self> {
        let html = html.into();
        if html.trim().is_empty() {
            return None;
        }
        Some(Self {
            html,
            meta_title: None,
            meta_description: None,
        })
    }

    /// Build a deterministic placeholder for the query.
    pub fn placeholder(reason: Placeholder, query: &str, locale: &str) -> Self {
        Self {
            html: reason.render(query, locale),
            meta_title: None,
            meta_description: None,
        }
    }

    /// Fill any missing metadata field from the markup.
    pub fn with_derived_meta(mut self, query: &str, locale: &str) -> Self {
        if self.meta_title.is_none() || self.meta_description.is_none() {
            let derived = derive_meta(&self.html, query, locale);
            self.meta_title.get_or_insert(derived.title);
            self.meta_description.get_or_insert(derived.description);
        }
        self
    }

    /// Whether both metadata fields are set.
    pub fn has_meta(&self) -> bool {
        self.meta_title.is_some() && self.meta_description.is_some()
    }
}

/// A single suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaItem {
    pub title: String,

    /// Keyword-style follow-up query
    pub query: String,

    pub description: String,
}

impl IdeaItem {
    /// Build an item, rejecting blank fields.
    pub fn new(
        title: impl Into<String>,
        query: impl Into<String>,
        description: impl Into<String>,
    ) -> Option<Self> {
        let item = Self {
            title: title.into().trim().to_string(),
            query: query.into().trim().to_string(),
            description: description.into().trim().to_string(),
        };
        (!item.title.is_empty() && !item.query.is_empty() && !item.description.is_empty())
            .then_some(item)
    }
}

/// Ordered suggestions, at most [`MAX_IDEAS`] long.
///
/// Order is the provider's order; nothing re-sorts it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdeaList(Vec<IdeaItem>);

impl IdeaList {
    /// Take the first [`MAX_IDEAS`] items.
    pub fn from_items(items: impl IntoIterator<Item = IdeaItem>) -> Self {
        Self(items.into_iter().take(MAX_IDEAS).collect())
    }

    pub fn items(&self) -> &[IdeaItem] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialized form used by the persistent store.
    pub fn to_json(&self) -> String {
        // Vec of plain string structs cannot fail to serialize.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parse the persistent store's serialized form.
    ///
    /// Blank items are dropped and the result is truncated, so a row written
    /// by an older or foreign writer cannot violate the list invariants.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let items: Vec<IdeaItem> = serde_json::from_str(raw)?;
        Ok(Self::from_items(items.into_iter().filter_map(|it| {
            IdeaItem::new(it.title, it.query, it.description)
        })))
    }
}

impl IntoIterator for IdeaList {
    type Item = IdeaItem;
    type IntoIter = std::vec::IntoIter<IdeaItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
