// src/services/faculty.rs

//! Faculty directory extraction.
//!
//! Profile elements are located on the faculty listing page, serialized and
//! handed to blocking workers, where each is walked and its fragments routed
//! into [`FacultyRecord`] fields by an ordered keyword rule table.

use std::collections::HashSet;
use std::sync::Arc;

use futures::{StreamExt, stream};
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, Document, FacultyField, FacultyRecord, FieldRule};
use crate::services::ContentClassifier;

/// Routes text fragments of faculty profiles into record fields.
pub struct FacultyExtractor {
    rules: Vec<FieldRule>,
    profile_selectors: Vec<(String, Selector)>,
    classifier: ContentClassifier,
}

impl FacultyExtractor {
    pub fn new(config: &Config) -> Result<Self> {
        let profile_selectors = config
            .faculty
            .profile_selectors
            .iter()
            .map(|css| {
                Selector::parse(css)
                    .map(|s| (css.clone(), s))
                    .map_err(|e| AppError::selector(css, format!("{e:?}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules: config
                .faculty
                .rules
                .iter()
                .map(|rule| FieldRule {
                    field: rule.field,
                    keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                })
                .collect(),
            profile_selectors,
            classifier: ContentClassifier::new(&config.extraction),
        })
    }

    /// Field for a single fragment: the first matching rule, else additional info.
    pub fn route(&self, text: &str) -> FacultyField {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lower))
            .map(|rule| rule.field)
            .unwrap_or(FacultyField::AdditionalInfo)
    }

    /// Build a record from already-extracted fragments.
    pub fn classify<I, S>(&self, fragments: I) -> FacultyRecord
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut record = FacultyRecord::default();
        for fragment in fragments {
            let text = fragment.into().trim().to_string();
            if text.is_empty() {
                continue;
            }
            record.insert(self.route(&text), text);
        }
        record
    }

    /// Walk a profile element and classify its fragments.
    pub fn extract_faculty(&self, element: ElementRef<'_>) -> FacultyRecord {
        let fragments = self.classifier.extract_fragments(element);
        self.classify(fragments.into_iter().map(|item| item.text))
    }

    /// [`extract_faculty`](Self::extract_faculty) on serialized profile markup.
    pub fn extract_from_fragment(&self, markup: &str) -> FacultyRecord {
        let html = Html::parse_fragment(markup);
        self.extract_faculty(html.root_element())
    }

    /// Outer HTML of every profile element on the page.
    ///
    /// Matches from all selectors are pooled and deduplicated; an element
    /// that contains another match is a wrapper and is dropped.
    pub fn profile_fragments(&self, html: &Html) -> Vec<String> {
        let mut matched: Vec<ElementRef<'_>> = Vec::new();
        let mut ids = HashSet::new();

        for (css, selector) in &self.profile_selectors {
            let before = matched.len();
            matched.extend(html.select(selector).filter(|el| ids.insert(el.id())));
            let found = matched.len() - before;
            if found > 0 {
                log::debug!("Found {} faculty profile(s) with selector: {}", found, css);
            }
        }

        let wrappers: HashSet<_> = matched
            .iter()
            .filter(|el| {
                el.descendants()
                    .skip(1)
                    .any(|node| ids.contains(&node.id()))
            })
            .map(|el| el.id())
            .collect();

        // Document order, independent of selector order.
        html.root_element()
            .descendants()
            .filter(|node| ids.contains(&node.id()) && !wrappers.contains(&node.id()))
            .filter_map(ElementRef::wrap)
            .map(|el| el.html())
            .collect()
    }

    /// Extract every non-empty profile from the faculty page.
    ///
    /// Profiles are processed on blocking workers, at most `concurrency` at a
    /// time; records keep page order.
    pub async fn extract_all(
        self: &Arc<Self>,
        document: &Document,
        concurrency: usize,
    ) -> Vec<FacultyRecord> {
        let fragments = self.profile_fragments(&document.parse());
        log::info!("Found {} faculty profile element(s)", fragments.len());

        let records: Vec<FacultyRecord> = stream::iter(fragments)
            .map(|markup| {
                let extractor = Arc::clone(self);
                tokio::task::spawn_blocking(move || extractor.extract_from_fragment(&markup))
            })
            .buffered(concurrency.max(1))
            .filter_map(|joined| async move {
                match joined {
                    Ok(record) => Some(record),
                    Err(e) => {
                        log::warn!("Faculty profile worker failed: {}", e);
                        None
                    }
                }
            })
            .filter(|record| std::future::ready(!record.is_empty()))
            .collect()
            .await;

        records
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::models::Location;

    fn extractor() -> FacultyExtractor {
        FacultyExtractor::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_routes_fragments_to_fields() {
        let record = extractor().classify([
            "Dr. Jane Doe",
            "Associate Professor",
            "jane@iiitkottayam.ac.in",
            "PhD in Machine Learning",
        ]);

        assert_eq!(record.name.as_deref(), Some("Dr. Jane Doe"));
        assert_eq!(record.designation.as_deref(), Some("Associate Professor"));
        assert_eq!(record.email.as_deref(), Some("jane@iiitkottayam.ac.in"));
        assert_eq!(record.qualifications, vec!["PhD in Machine Learning"]);
        assert!(record.additional_info.is_empty());
        assert_eq!(record.fragment_count(), 4);
    }

    #[test]
    fn test_rule_order_is_first_match() {
        let e = extractor();
        // Honorific wins over role keyword.
        assert_eq!(e.route("Prof. and Head, CSE"), FacultyField::Name);
        // Role wins over degree.
        assert_eq!(e.route("Assistant Professor (Ph.D)"), FacultyField::Designation);
        assert_eq!(
            e.route("Research interests: wireless networks"),
            FacultyField::ResearchInterests
        );
        assert_eq!(
            e.route("Specialization: VLSI"),
            FacultyField::Specializations
        );
        assert_eq!(
            e.route("Journal of Applied Physics"),
            FacultyField::Publications
        );
        assert_eq!(e.route("Joined in 2019"), FacultyField::AdditionalInfo);
    }

    #[test]
    fn test_extract_faculty_walks_profile() {
        let html = Html::parse_fragment(
            r#"<div class="faculty-profile">
                 <h3>Dr. Jane Doe</h3>
                 <span>Associate Professor</span>
                 <a href="mailto:jane@iiitkottayam.ac.in">jane@iiitkottayam.ac.in</a>
                 <p>Research interests: machine learning</p>
                 <button>Close</button>
               </div>"#,
        );
        let record = extractor().extract_faculty(html.root_element());

        assert_eq!(record.name.as_deref(), Some("Dr. Jane Doe"));
        assert_eq!(record.designation.as_deref(), Some("Associate Professor"));
        assert_eq!(record.email.as_deref(), Some("jane@iiitkottayam.ac.in"));
        assert_eq!(record.research_interests.len(), 1);
        assert_eq!(record.fragment_count(), 4);
    }

    #[test]
    fn test_profile_fragments_innermost_only() {
        let html = Html::parse_document(
            r#"<body><section class="faculty-section">
                 <div class="faculty-profile"><h3>Dr. A</h3></div>
                 <div class="faculty-profile profile-card"><h3>Dr. B</h3></div>
               </section></body>"#,
        );
        let fragments = extractor().profile_fragments(&html);

        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].contains("Dr. A"));
        assert!(fragments[1].contains("Dr. B"));
    }

    #[tokio::test]
    async fn test_extract_all_drops_empty_records() {
        let doc = Document::from_html(
            Location::route("faculty"),
            Url::parse("https://iiitkottayam.ac.in/#!/faculty").unwrap(),
            r#"<body>
                 <div class="faculty-profile"><h3>Dr. A</h3><p>Professor</p></div>
                 <div class="faculty-profile"></div>
                 <div class="faculty-profile"><h3>Prof. B</h3></div>
               </body>"#,
        );

        let extractor = Arc::new(extractor());
        let records = extractor.extract_all(&doc, 4).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("Dr. A"));
        assert_eq!(records[0].designation.as_deref(), Some("Professor"));
        assert_eq!(records[1].name.as_deref(), Some("Prof. B"));
    }
}
