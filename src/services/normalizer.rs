// src/services/normalizer.rs

//! URL normalization and validation.
//!
//! Turns raw `href`/`src` values into [`Location`] keys and filters out
//! everything that is not crawlable site content.

use regex::{Regex, RegexBuilder};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Location, SiteConfig};
use crate::utils::{get_domain, resolve_url};

/// Canonicalizes link references for the configured site.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    base: Url,
    domain: String,
    disallowed_prefixes: Vec<String>,
    excluded: Vec<Regex>,
}

impl UrlNormalizer {
    /// Build a normalizer for the site described by `config`.
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        let domain = get_domain(&base)
            .ok_or_else(|| AppError::config(format!("No host in {}", config.base_url)))?;

        let excluded = config
            .excluded_patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            base,
            domain,
            disallowed_prefixes: config
                .disallowed_prefixes
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            excluded,
        })
    }

    /// Site root URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Host every accepted location must live on.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Normalize a reference relative to the site root.
    pub fn normalize(&self, raw: &str) -> Option<Location> {
        self.normalize_against(raw, &self.base)
    }

    /// Normalize a reference found on the page at `base`.
    ///
    /// Returns `None` for anything that is not a content location on this
    /// site; rejected references are expected and never logged as errors.
    pub fn normalize_against(&self, raw: &str, base: &Url) -> Option<Location> {
        let raw = raw.trim();
        if !self.is_valid_link(raw) {
            return None;
        }

        let url = resolve_url(base, raw)?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        if get_domain(&url).as_deref() != Some(self.domain.as_str()) {
            return None;
        }

        let hashbang = url
            .fragment()
            .and_then(|f| f.strip_prefix('!'))
            .map(str::to_string);

        let path = url.path().trim_end_matches('/');
        let path = if path.is_empty() { "/" } else { path };

        let location = Location::new(path, hashbang);
        if self.is_excluded(&location.to_string()) {
            return None;
        }

        Some(location)
    }

    /// Prefix-level rejection of references that can never be content.
    pub fn is_valid_link(&self, raw: &str) -> bool {
        if raw.is_empty() {
            return false;
        }

        // A bare fragment is an in-page anchor; `#!` is a route.
        if raw.starts_with('#') && !raw.starts_with("#!") {
            return false;
        }

        let lower = raw.to_lowercase();
        !self
            .disallowed_prefixes
            .iter()
            .any(|prefix| lower.starts_with(prefix.as_str()))
    }

    fn is_excluded(&self, candidate: &str) -> bool {
        self.excluded.iter().any(|re| re.is_match(candidate))
    }
}
