//! Pipeline entry points for crawler operations.
//!
//! - `run_mapper`: Explore the site and persist its map
//! - `run_crawler`: Extract sections, endpoints and the faculty directory

pub mod crawl;
pub mod map;

pub use crawl::{CrawlOptions, CrawlSummary, run_crawler, run_faculty, run_section};
pub use map::run_mapper;
