// src/services/classifier.rs

//! Text classification and tree walking.

use std::collections::HashSet;

use scraper::ElementRef;

use crate::models::{ContentItem, ExtractionConfig, normalize_whitespace};
use crate::utils::text_len;

/// Decides which strings of a page are worth keeping.
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    min_len: usize,
    max_depth: usize,
    text_tags: HashSet<String>,
    ignore_phrases: Vec<String>,
    indicators: Vec<String>,
}

impl ContentClassifier {
    pub fn new(config: &ExtractionConfig) -> Self {
        let lower = |items: &[String]| items.iter().map(|s| s.to_lowercase()).collect();

        Self {
            min_len: config.meaningful_min_len,
            max_depth: config.max_walk_depth,
            text_tags: config
                .text_bearing_tags
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            ignore_phrases: lower(&config.ignore_phrases),
            indicators: lower(&config.content_indicators),
        }
    }

    /// Not near-empty and not UI chrome.
    pub fn is_fragment(&self, text: &str) -> bool {
        let text = text.trim();
        if text_len(text) < self.min_len {
            return false;
        }
        let lower = text.to_lowercase();
        !self.ignore_phrases.iter().any(|p| lower.contains(p.as_str()))
    }

    /// A fragment that also mentions at least one domain keyword.
    pub fn is_meaningful(&self, text: &str) -> bool {
        if !self.is_fragment(text) {
            return false;
        }
        let lower = text.to_lowercase();
        self.indicators.iter().any(|i| lower.contains(i.as_str()))
    }

    /// Meaningful direct text of every text-bearing element under `root`.
    pub fn extract_all_text(&self, root: ElementRef<'_>) -> Vec<ContentItem> {
        self.walk(root, |text| self.is_meaningful(text))
    }

    /// Like [`extract_all_text`](Self::extract_all_text) without the keyword
    /// requirement; profile fragments such as names rarely carry one.
    pub fn extract_fragments(&self, root: ElementRef<'_>) -> Vec<ContentItem> {
        self.walk(root, |text| self.is_fragment(text))
    }

    /// Pre-order walk with an explicit stack.
    ///
    /// Only the element's own text nodes are read, so nested markup is
    /// reported at its own depth. Elements below `max_walk_depth` are skipped.
    fn walk(&self, root: ElementRef<'_>, keep: impl Fn(&str) -> bool) -> Vec<ContentItem> {
        let mut items = Vec::new();
        let mut stack = vec![(root, 0usize)];
        let mut truncated = false;

        while let Some((element, depth)) = stack.pop() {
            let tag = element.value().name();

            if self.text_tags.contains(tag) {
                let direct: String = element
                    .children()
                    .filter_map(|node| node.value().as_text())
                    .map(|text| &**text)
                    .collect::<Vec<_>>()
                    .join(" ");
                let text = normalize_whitespace(&direct);

                if !text.is_empty() && keep(&text) {
                    items.push(ContentItem::with_depth(tag, text, depth));
                }
            }

            if depth >= self.max_depth {
                truncated = true;
                continue;
            }

            let children: Vec<_> = element.children().filter_map(ElementRef::wrap).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }

        if truncated {
            log::debug!("Text walk stopped at depth {}", self.max_depth);
        }
        items
    }
}
