// src/services/mod.rs

//! Crawling and extraction services.

mod classifier;
mod faculty;
mod fetcher;
mod frontier;
mod normalizer;
mod rate_limit;
mod render;
mod sections;

pub use classifier::ContentClassifier;
pub use faculty::FacultyExtractor;
pub use fetcher::{FetchStats, Fetcher};
pub use frontier::{CrawlState, SiteMapper};
pub use normalizer::UrlNormalizer;
pub use rate_limit::FetchRateLimiter;
#[cfg(feature = "render")]
pub use render::ChromeRenderer;
pub use render::Renderer;
#[cfg(test)]
pub(crate) use render::tests::StubRenderer;
pub use sections::SectionExtractor;
