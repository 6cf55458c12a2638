//! Utility functions and helpers.

pub mod http;
pub mod log;

use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok()
}

/// Extract the lowercase host from a URL.
pub fn get_domain(url: &Url) -> Option<String> {
    url.host_str().map(|s| s.to_lowercase())
}

/// Length of a string in user-perceived characters.
pub fn text_len(text: &str) -> usize {
    text.graphemes(true).count()
}
