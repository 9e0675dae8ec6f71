//! Idea list parsing and the deterministic default list.
//!
//! Provider output is parsed leniently: fences are stripped, surrounding
//! chatter is ignored, malformed items are dropped. A response that yields
//! no usable item is an error so the caller can move on.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::types::{IdeaItem, IdeaList};

/// Errors from idea list parsing.
#[derive(Error, Debug)]
pub enum IdeaParseError {
    #[error("Response is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("Response JSON is not a list of ideas")]
    NotAList,

    #[error("Response contained no usable ideas")]
    Empty,
}

/// Item shape requested from providers. Short field names from older
/// prompts are accepted too.
#[derive(Debug, Deserialize)]
struct RawIdea {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "q")]
    query: Option<String>,
    #[serde(default, alias = "desc")]
    description: Option<String>,
}

/// Parse provider text into an idea list.
pub fn parse_idea_list(text: &str) -> Result<IdeaList, IdeaParseError> {
    let stripped = strip_json_fences(text);
    let value: JsonValue = match serde_json::from_str(stripped) {
        Ok(value) => value,
        Err(err) => match bracketed(stripped) {
            Some(inner) => serde_json::from_str(inner)?,
            None => return Err(IdeaParseError::NotJson(err)),
        },
    };

    let entries = match value {
        JsonValue::Array(entries) => entries,
        JsonValue::Object(mut map) => match ["ideas", "items"]
            .iter()
            .find_map(|field| map.remove(*field))
        {
            Some(JsonValue::Array(entries)) => entries,
            _ => return Err(IdeaParseError::NotAList),
        },
        _ => return Err(IdeaParseError::NotAList),
    };

    let list = IdeaList::from_items(entries.into_iter().filter_map(|entry| {
        let raw: RawIdea = serde_json::from_value(entry).ok()?;
        IdeaItem::new(raw.title?, raw.query?, raw.description?)
    }));

    if list.is_empty() {
        return Err(IdeaParseError::Empty);
    }
    Ok(list)
}

/// Six templated ideas derived from the query alone.
pub fn default_ideas(query: &str) -> IdeaList {
    let q = query.trim();
    let templates = [
        (format!("What is {q}?"), format!("{q} overview"), format!("Understand the basics and key facts about {q}.")),
        (format!("{q} tips & tricks"), format!("{q} tips"), format!("A quick set of practical tips for {q}.")),
        (format!("Best {q} resources"), format!("{q} resources"), format!("Curated links and resources to go deeper on {q}.")),
        (format!("Common {q} mistakes"), format!("{q} mistakes"), format!("Pitfalls to avoid when dealing with {q}.")),
        (format!("{q} FAQs"), format!("{q} FAQ"), "Frequently asked questions with concise answers.".to_string()),
        (format!("Latest {q} updates"), format!("{q} news"), format!("Recent developments and news related to {q}.")),
    ];

    // Templates carry fixed text, so no field is ever blank.
    IdeaList::from_items(templates.into_iter().map(|(title, query, description)| IdeaItem {
        title,
        query,
        description,
    }))
}

fn strip_json_fences(text: &str) -> &str {
    let t = text.trim();
    let t = t
        .strip_prefix("```json")
        .or_else(|| t.strip_prefix("```JSON"))
        .or_else(|| t.strip_prefix("```"))
        .unwrap_or(t);
    t.trim_end().strip_suffix("```").unwrap_or(t).trim()
}

fn bracketed(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MAX_IDEAS;

    #[test]
    fn test_parse_fenced_array() {
        let text = "```json\n[{\"title\": \"Brewing\", \"query\": \"tea brewing\", \"description\": \"How to brew.\"}]\n```";
        let list = parse_idea_list(text).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.items()[0].query, "tea brewing");
    }

    #[test]
    fn test_parse_with_chatter_and_aliases() {
        let text = "Here you go: [{\"title\": \"A\", \"q\": \"a q\", \"desc\": \"a d\"}] Enjoy!";
        let list = parse_idea_list(text).unwrap();
        assert_eq!(list.items()[0].description, "a d");
    }

    #[test]
    fn test_parse_wrapped_object() {
        let text = r#"{"ideas": [{"title": "A", "query": "b", "description": "c"}]}"#;
        assert_eq!(parse_idea_list(text).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_items_dropped() {
        let text = r#"[{"title": "A"}, {"title": "B", "query": "b", "description": "c"}, 7]"#;
        let list = parse_idea_list(text).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.items()[0].title, "B");
    }

    #[test]
    fn test_rejects_unusable_responses() {
        assert!(matches!(parse_idea_list("not json"), Err(IdeaParseError::NotJson(_))));
        assert!(matches!(parse_idea_list("[]"), Err(IdeaParseError::Empty)));
        assert!(matches!(parse_idea_list("{\"x\": 1}"), Err(IdeaParseError::NotAList)));
        assert!(matches!(parse_idea_list("\"text\""), Err(IdeaParseError::NotAList)));
    }

    #[test]
    fn test_truncates_long_lists() {
        let items: Vec<String> = (0..9)
            .map(|i| format!(r#"{{"title": "t{i}", "query": "q{i}", "description": "d{i}"}}"#))
            .collect();
        let text = format!("[{}]", items.join(","));
        assert_eq!(parse_idea_list(&text).unwrap().len(), MAX_IDEAS);
    }

    #[test]
    fn test_default_ideas() {
        let list = default_ideas("kombucha");
        assert_eq!(list.len(), 6);
        assert_eq!(list.items()[0].title, "What is kombucha?");
        assert_eq!(list.items()[5].query, "kombucha news");
        for item in list.items() {
            assert!(!item.title.is_empty() && !item.query.is_empty() && !item.description.is_empty());
        }
    }
}
