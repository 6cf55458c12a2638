//! Extracted content units.

use serde::{Deserialize, Serialize};

/// One unit of extracted page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Lowercase tag name the text came from (e.g., "p", "h2", "li")
    pub tag: String,

    /// Whitespace-collapsed text
    pub text: String,

    /// Nesting depth below the walk root, for text-walk items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

impl ContentItem {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            depth: None,
        }
    }

    pub fn with_depth(tag: impl Into<String>, text: impl Into<String>, depth: usize) -> Self {
        Self {
            depth: Some(depth),
            ..Self::new(tag, text)
        }
    }

    /// Format as an output line: `[TAG] text`.
    pub fn line(&self) -> String {
        format!("[{}] {}", self.tag.to_uppercase(), self.text)
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
