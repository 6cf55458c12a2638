//! Normalized crawl locations.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Marker that introduces a client-side route in a URL fragment.
pub const HASHBANG: &str = "#!";

/// A crawlable unit of the site: a path plus an optional hashbang route.
///
/// Locations are always relative to the configured site and produced by
/// [`UrlNormalizer`](crate::services::UrlNormalizer), so two raw references to
/// the same resource compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Path without query, fragment or trailing slash (`/` for the root)
    pub path: String,

    /// Route after `#!`, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashbang: Option<String>,
}

impl Location {
    /// Create a location from already-normalized parts.
    pub fn new(path: impl Into<String>, hashbang: Option<String>) -> Self {
        Self {
            path: path.into(),
            hashbang,
        }
    }

    /// The site root.
    pub fn root() -> Self {
        Self::new("/", None)
    }

    /// Hashbang route for a section or endpoint name (`about` → `/#!/about`).
    pub fn route(name: &str) -> Self {
        let name = name.trim().trim_matches('/');
        Self::new("/", Some(format!("/{name}")))
    }

    /// Whether the location is a client-side route.
    pub fn is_hashbang(&self) -> bool {
        self.hashbang.is_some()
    }

    /// The same path with the hashbang route stripped.
    pub fn base_document(&self) -> Self {
        Self::new(self.path.clone(), None)
    }

    /// Absolute URL of the location on the given site.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.join(&self.path)?;
        url.set_query(None);
        match &self.hashbang {
            Some(route) => url.set_fragment(Some(&format!("!{route}"))),
            None => url.set_fragment(None),
        }
        Ok(url)
    }

    /// Output file stem: route or path segments joined by `_`, `home` when empty.
    pub fn file_stem(&self) -> String {
        let source = self.hashbang.as_deref().unwrap_or(&self.path);
        let stem = source
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(sanitize_segment)
            .collect::<Vec<_>>()
            .join("_");

        if stem.is_empty() {
            "home".to_string()
        } else {
            stem
        }
    }
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hashbang {
            Some(route) => write!(f, "{}{}{}", self.path, HASHBANG, route),
            None => f.write_str(&self.path),
        }
    }
}
