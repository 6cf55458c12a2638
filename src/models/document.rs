//! Fetched documents.

use chrono::{DateTime, Utc};
use scraper::Html;
use url::Url;

use crate::models::Location;

/// How a document was retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Plain HTTP GET
    Static,
    /// Headless browser navigation
    Dynamic,
}

/// A fetched page and its fetch metadata.
///
/// The markup is kept as text so documents can be cached and shared between
/// workers; call [`Document::parse`] to get a tree for extraction.
#[derive(Debug, Clone)]
pub struct Document {
    /// Location that was requested
    pub location: Location,

    /// URL the markup was read from (may be the base document on fallback)
    pub url: Url,

    /// HTTP status, when known
    pub status: Option<u16>,

    /// Retrieval mode
    pub mode: FetchMode,

    /// Fetch completion time
    pub fetched_at: DateTime<Utc>,

    html: String,
}

impl Document {
    pub fn new(
        location: Location,
        url: Url,
        status: Option<u16>,
        mode: FetchMode,
        html: String,
    ) -> Self {
        Self {
            location,
            url,
            status,
            mode,
            fetched_at: Utc::now(),
            html,
        }
    }

    /// Raw markup.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parse the markup into a document tree.
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Convenience constructor for tests and fixtures.
    pub fn from_html(location: Location, url: Url, html: impl Into<String>) -> Self {
        Self::new(location, url, Some(200), FetchMode::Static, html.into())
    }
}
