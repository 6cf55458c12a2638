// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod content;
mod document;
mod faculty;
mod location;
mod sitemap;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, ExtractionConfig, FacultyConfig, FacultyField, FieldRule,
    PathsConfig, RenderConfig, RoutesConfig, SectionRule, SiteConfig,
};
pub use content::{ContentItem, normalize_whitespace};
pub use document::{Document, FetchMode};
pub use faculty::FacultyRecord;
pub use location::{HASHBANG, Location};
pub use sitemap::SiteMap;
