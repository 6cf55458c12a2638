//! Site map produced by the mapper.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Location;

/// Result of exploring the site from a start location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteMap {
    /// Root the exploration started from
    pub start: Location,

    /// Depth limit the exploration ran with
    pub max_depth: u32,

    /// Locations that were fetched (or attempted)
    pub visited: BTreeSet<Location>,

    /// Client-side routes seen in links; recorded, never expanded
    pub hashbang_routes: BTreeSet<Location>,

    pub generated_at: DateTime<Utc>,
}

impl SiteMap {
    pub fn new(start: Location, max_depth: u32) -> Self {
        Self {
            start,
            max_depth,
            visited: BTreeSet::new(),
            hashbang_routes: BTreeSet::new(),
            generated_at: Utc::now(),
        }
    }

    /// Total number of distinct locations known.
    pub fn len(&self) -> usize {
        self.visited.len() + self.hashbang_routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty() && self.hashbang_routes.is_empty()
    }
}
