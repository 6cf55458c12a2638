//! Storage abstractions for crawl output.
//!
//! ## Directory Structure
//!
//! ```text
//! {storage_dir}/
//! ├── sitemap.json                  # Site map from the mapper
//! └── content/
//!     ├── about.txt                 # One file per section/endpoint
//!     ├── placement.txt
//!     ├── faculty_directory.txt     # Aggregate faculty directory
//!     └── faculty_directory.txt.bak # Previous version
//! ```

pub mod format;
pub mod local;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ContentItem, FacultyRecord, SiteMap};

// Re-export for convenience
pub use local::LocalStorage;

/// Header lines of a content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHeader {
    /// Source URL of the content
    pub url: String,
    /// Section label; endpoint files have none
    pub section: Option<String>,
}

impl ContentHeader {
    /// Header for a priority section file.
    pub fn section(url: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            section: Some(section.into()),
        }
    }

    /// Header for an endpoint file.
    pub fn endpoint(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            section: None,
        }
    }
}

/// Trait for crawl output backends.
///
/// Saving nothing is not an error: empty input leaves storage untouched and
/// returns `Ok(None)`.
#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Write (or overwrite) the file for one section or endpoint.
    async fn save_section(
        &self,
        name: &str,
        header: &ContentHeader,
        items: &[ContentItem],
    ) -> Result<Option<PathBuf>>;

    /// Write the faculty directory, keeping the previous version as a backup.
    async fn save_faculty(&self, records: &[FacultyRecord]) -> Result<Option<PathBuf>>;

    /// Persist the site map.
    async fn save_site_map(&self, map: &SiteMap) -> Result<PathBuf>;

    /// Load the site map, if one has been written.
    async fn load_site_map(&self) -> Result<Option<SiteMap>>;
}
