// src/services/sections.rs

//! Institutional section extraction.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, ContentItem, Document, normalize_whitespace};
use crate::services::ContentClassifier;
use crate::utils::text_len;

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::selector(css, format!("{e:?}")))
}

/// Concatenated, whitespace-collapsed text of an element.
fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

struct SectionSelectors {
    name: String,
    selectors: Vec<(String, Selector)>,
}

/// Turns a page into an ordered list of [`ContentItem`]s.
///
/// Output order: page title, section headings and paragraphs (section by
/// section, selector by selector), then list items and table rows from the
/// whole page.
pub struct SectionExtractor {
    sections: Vec<SectionSelectors>,
    title: Selector,
    headings: Selector,
    paragraphs: Selector,
    containers: Selector,
    rows: Selector,
    body: Selector,
    paragraph_min_len: usize,
    list_item_min_len: usize,
    fallback_text_walk: bool,
    classifier: ContentClassifier,
}

impl SectionExtractor {
    pub fn new(config: &Config) -> Result<Self> {
        let sections = config
            .sections
            .iter()
            .map(|rule| {
                let selectors = rule
                    .selectors
                    .iter()
                    .map(|css| Ok((css.clone(), parse_selector(css)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SectionSelectors {
                    name: rule.name.clone(),
                    selectors,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sections,
            title: parse_selector("title")?,
            headings: parse_selector("h1, h2, h3, h4")?,
            paragraphs: parse_selector("p")?,
            containers: parse_selector("ul, ol, table")?,
            rows: parse_selector("li, tr")?,
            body: parse_selector("body")?,
            paragraph_min_len: config.extraction.paragraph_min_len,
            list_item_min_len: config.extraction.list_item_min_len,
            fallback_text_walk: config.extraction.fallback_text_walk,
            classifier: ContentClassifier::new(&config.extraction),
        })
    }

    /// Extract the content items of a fetched document.
    pub fn extract_sections(&self, document: &Document) -> Vec<ContentItem> {
        let items = self.extract_from_html(&document.parse());
        log::debug!("Extracted {} item(s) from {}", items.len(), document.url);
        items
    }

    pub fn extract_from_html(&self, html: &Html) -> Vec<ContentItem> {
        let mut items = Vec::new();

        if let Some(title) = html.select(&self.title).next() {
            let text = element_text(title);
            if !text.is_empty() {
                items.push(ContentItem::new("title", text));
            }
        }

        let (section_items, matched) = self.section_items(html, None);
        items.extend(section_items);

        if !matched && self.fallback_text_walk {
            let root = html.select(&self.body).next().unwrap_or(html.root_element());
            items.extend(self.classifier.extract_all_text(root));
        }

        items.extend(self.list_items(html));
        items
    }

    /// Only the named section's headings and paragraphs.
    ///
    /// Used when a route was served the shared base document instead of its
    /// own rendering: the title, lists and text walk of that document belong
    /// to no route in particular.
    pub fn extract_named_section(&self, document: &Document, name: &str) -> Vec<ContentItem> {
        let (items, _) = self.section_items(&document.parse(), Some(name));
        log::debug!(
            "Extracted {} item(s) of section '{}' from {}",
            items.len(),
            name,
            document.url
        );
        items
    }

    /// Headings and long paragraphs inside section containers, optionally
    /// restricted to one section.
    ///
    /// Also reports whether any section selector matched at all.
    fn section_items(&self, html: &Html, only: Option<&str>) -> (Vec<ContentItem>, bool) {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut matched = false;

        let sections = self
            .sections
            .iter()
            .filter(|section| only.is_none_or(|name| section.name == name));

        for section in sections {
            for (css, selector) in &section.selectors {
                let mut elements = html.select(selector).peekable();
                if elements.peek().is_none() {
                    continue;
                }
                matched = true;
                log::debug!("Found {} section with selector {}", section.name, css);

                for element in elements {
                    for heading in element.select(&self.headings) {
                        let text = element_text(heading);
                        if !text.is_empty() && seen.insert(heading.id()) {
                            items.push(ContentItem::new(heading.value().name(), text));
                        }
                    }

                    for paragraph in element.select(&self.paragraphs) {
                        let text = element_text(paragraph);
                        if text_len(&text) > self.paragraph_min_len && seen.insert(paragraph.id())
                        {
                            items.push(ContentItem::new("p", text));
                        }
                    }
                }
            }
        }

        (items, matched)
    }

    /// List items and table rows from every list and table on the page.
    fn list_items(&self, html: &Html) -> Vec<ContentItem> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();

        for container in html.select(&self.containers) {
            for row in container.select(&self.rows) {
                let text = element_text(row);
                if text_len(&text) > self.list_item_min_len && seen.insert(row.id()) {
                    items.push(ContentItem::new(row.value().name(), text));
                }
            }
        }

        items
    }
}
