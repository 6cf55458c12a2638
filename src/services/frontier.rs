// src/services/frontier.rs

//! Site exploration.
//!
//! [`SiteMapper`] walks the site breadth-first from a start location, level
//! by level, fetching each level through a bounded worker pool. All
//! bookkeeping lives in a [`CrawlState`] whose visited/pending sets are
//! updated under one lock, so a location is claimed by exactly one worker.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, PoisonError};

use futures::{StreamExt, stream};
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, Document, Location, SiteMap};
use crate::services::{Fetcher, UrlNormalizer};

/// Elements and attributes that carry link references.
const LINK_SOURCES: [(&str, &str); 5] = [
    ("a[href]", "href"),
    ("link[href]", "href"),
    ("script[src]", "src"),
    ("img[src]", "src"),
    ("form[action]", "action"),
];

/// Quoted absolute paths inside inline scripts.
const SCRIPT_PATH_PATTERN: &str = r#"["'](/[^"'\s]*)["']"#;

#[derive(Default)]
struct FrontierSets {
    visited: HashSet<Location>,
    pending: HashSet<Location>,
}

/// Shared crawl bookkeeping for one run.
///
/// `visited` and `pending` are disjoint at all times; moving a location from
/// one to the other happens under a single lock.
#[derive(Default)]
pub struct CrawlState {
    sets: Mutex<FrontierSets>,
    hashbang_routes: Mutex<BTreeSet<Location>>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a location to the frontier unless it is already known.
    pub fn enqueue(&self, location: Location) -> bool {
        let mut sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        if sets.visited.contains(&location) {
            return false;
        }
        sets.pending.insert(location)
    }

    /// Take ownership of a pending location for fetching.
    ///
    /// Returns `false` if it was never enqueued or another worker already
    /// claimed it.
    pub fn claim(&self, location: &Location) -> bool {
        let mut sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        if sets.pending.remove(location) {
            sets.visited.insert(location.clone());
            true
        } else {
            false
        }
    }

    pub fn is_visited(&self, location: &Location) -> bool {
        let sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.visited.contains(location)
    }

    /// Note a client-side route seen in a link.
    pub fn record_hashbang(&self, location: Location) -> bool {
        let mut routes = self
            .hashbang_routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        routes.insert(location)
    }

    pub fn visited_count(&self) -> usize {
        let sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.visited.len()
    }

    pub fn pending_count(&self) -> usize {
        let sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        sets.pending.len()
    }

    /// Freeze the state into a site map.
    pub fn into_site_map(self, start: Location, max_depth: u32) -> SiteMap {
        let sets = self.sets.into_inner().unwrap_or_else(PoisonError::into_inner);
        let routes = self
            .hashbang_routes
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        let mut map = SiteMap::new(start, max_depth);
        map.visited = sets.visited.into_iter().collect();
        map.hashbang_routes = routes;
        map
    }
}

/// Pre-parsed selectors for link discovery.
struct LinkSelectors {
    sources: Vec<(Selector, &'static str)>,
    inline_scripts: Selector,
    script_paths: Regex,
}

impl LinkSelectors {
    fn new() -> Result<Self> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| AppError::selector(css, format!("{e:?}")))
        };

        let sources = LINK_SOURCES
            .iter()
            .map(|&(css, attr)| Ok((parse(css)?, attr)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sources,
            inline_scripts: parse("script:not([src])")?,
            script_paths: Regex::new(SCRIPT_PATH_PATTERN)?,
        })
    }
}

/// Breadth-first explorer that builds a [`SiteMap`].
pub struct SiteMapper<'a> {
    fetcher: &'a Fetcher,
    normalizer: UrlNormalizer,
    priority_paths: Vec<Regex>,
    selectors: LinkSelectors,
    max_concurrent: usize,
}

impl<'a> SiteMapper<'a> {
    pub fn new(fetcher: &'a Fetcher, config: &Config) -> Result<Self> {
        let priority_paths = config
            .routes
            .priority_paths
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            fetcher,
            normalizer: UrlNormalizer::new(&config.site)?,
            priority_paths,
            selectors: LinkSelectors::new()?,
            max_concurrent: config.crawler.max_concurrent.max(1),
        })
    }

    /// Explore from `start`, fetching at most `max_depth` levels.
    ///
    /// Depth 0 fetches nothing. Every location is fetched at most once;
    /// hashbang routes are recorded but not followed, and ordinary links only
    /// join the frontier when their path matches a priority pattern.
    pub async fn crawl(&self, start: Location, max_depth: u32) -> SiteMap {
        let state = CrawlState::new();
        if max_depth == 0 {
            return state.into_site_map(start, max_depth);
        }

        state.enqueue(start.clone());
        let mut level = vec![start.clone()];

        for depth in 0..max_depth {
            if level.is_empty() {
                break;
            }
            log::info!("Depth {}: fetching {} location(s)", depth, level.len());

            let discovered: Vec<Vec<Location>> = stream::iter(level)
                .map(|location| {
                    let state = &state;
                    async move {
                        if !state.claim(&location) {
                            return Vec::new();
                        }
                        match self.fetcher.fetch_static(&location).await {
                            Some(document) => self.discover(&document),
                            None => Vec::new(),
                        }
                    }
                })
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;

            let expand = depth + 1 < max_depth;
            let mut next = Vec::new();
            for location in discovered.into_iter().flatten() {
                if location.is_hashbang() {
                    state.record_hashbang(location);
                } else if expand && self.is_priority(&location) && state.enqueue(location.clone())
                {
                    next.push(location);
                }
            }
            level = next;
        }

        let map = state.into_site_map(start, max_depth);
        log::info!(
            "Mapped {} location(s), {} hashbang route(s)",
            map.visited.len(),
            map.hashbang_routes.len()
        );
        map
    }

    /// Whether an ordinary link is worth following.
    pub fn is_priority(&self, location: &Location) -> bool {
        self.priority_paths
            .iter()
            .any(|re| re.is_match(&location.path))
    }

    /// Normalized, deduplicated links found in a document, in document order.
    pub fn discover(&self, document: &Document) -> Vec<Location> {
        let html = document.parse();
        let mut seen = HashSet::new();

        self.raw_links(&html)
            .into_iter()
            .filter_map(|raw| self.normalizer.normalize_against(&raw, &document.url))
            .filter(|location| seen.insert(location.clone()))
            .collect()
    }

    fn raw_links(&self, html: &Html) -> Vec<String> {
        let mut links = Vec::new();

        for (selector, attr) in &self.selectors.sources {
            links.extend(
                html.select(selector)
                    .filter_map(|el| el.value().attr(attr))
                    .map(str::to_string),
            );
        }

        for script in html.select(&self.selectors.inline_scripts) {
            let body: String = script.text().collect();
            links.extend(
                self.selectors
                    .script_paths
                    .captures_iter(&body)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string()),
            );
        }

        links
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use url::Url;

    use super::*;

    fn test_config(base_url: &str) -> Config {
        let mut config = Config::default();
        config.site.base_url = base_url.to_string();
        config.crawler.rate_limit_per_sec = 100;
        config.crawler.rate_burst = 10;
        config.crawler.max_concurrent = 4;
        config.render.enabled = false;
        config
    }

    #[test]
    fn test_state_claims_once() {
        let state = CrawlState::new();
        let about = Location::new("/about", None);

        assert!(state.enqueue(about.clone()));
        assert!(!state.enqueue(about.clone()));
        assert!(state.claim(&about));
        assert!(!state.claim(&about));
        assert!(!state.enqueue(about.clone()));
        assert!(state.is_visited(&about));
        assert_eq!(state.pending_count(), 0);
        assert_eq!(state.visited_count(), 1);
    }

    #[test]
    fn test_claim_requires_enqueue() {
        let state = CrawlState::new();
        assert!(!state.claim(&Location::root()));
        assert_eq!(state.visited_count(), 0);
    }

    #[test]
    fn test_discover() {
        let config = test_config("https://iiitkottayam.ac.in");
        let fetcher = Fetcher::with_renderer(&config, None).unwrap();
        let mapper = SiteMapper::new(&fetcher, &config).unwrap();

        let html = r##"
            <html><head>
                <link href="/static/site.css" rel="stylesheet">
                <script>var routes = ['/placement', "/about"];</script>
            </head><body>
                <a href="/about/">About</a>
                <a href="#!/faculty">Faculty</a>
                <a href="mailto:office@iiitkottayam.ac.in">Mail</a>
                <a href="https://twitter.com/iiitk">Twitter</a>
                <img src="/images/logo.png">
                <form action="/research"></form>
            </body></html>
        "##;
        let doc = Document::from_html(
            Location::root(),
            Url::parse("https://iiitkottayam.ac.in/").unwrap(),
            html,
        );

        let links = mapper.discover(&doc);
        assert_eq!(
            links,
            vec![
                Location::new("/about", None),
                Location::route("faculty"),
                Location::new("/research", None),
                Location::new("/placement", None),
            ]
        );
    }

    #[tokio::test]
    async fn test_depth_zero_fetches_nothing() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let config = test_config(&server.url());
        let fetcher = Fetcher::with_renderer(&config, None).unwrap();
        let mapper = SiteMapper::new(&fetcher, &config).unwrap();

        let map = mapper.crawl(Location::root(), 0).await;
        assert!(map.is_empty());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_each_location_fetched_once() {
        let mut server = Server::new_async().await;
        let root = server
            .mock("GET", "/")
            .with_body(
                r#"<a href="/about">About</a><a href="/research">R</a>
                   <a href="/#!/faculty">F</a><a href="/login">Login</a>"#,
            )
            .expect(1)
            .create_async()
            .await;
        let about = server
            .mock("GET", "/about")
            .with_body(r#"<a href="/">Home</a><a href="/research">R</a><a href="/about/vision">V</a>"#)
            .expect(1)
            .create_async()
            .await;
        let research = server
            .mock("GET", "/research")
            .with_body(r#"<a href="/about">About</a><a href="/news">News</a>"#)
            .expect(1)
            .create_async()
            .await;
        let vision = server
            .mock("GET", "/about/vision")
            .with_body("<p>vision</p>")
            .expect(1)
            .create_async()
            .await;
        let login = server
            .mock("GET", "/login")
            .expect(0)
            .create_async()
            .await;
        let news = server
            .mock("GET", "/news")
            .expect(0)
            .create_async()
            .await;

        let config = test_config(&server.url());
        let fetcher = Fetcher::with_renderer(&config, None).unwrap();
        let mapper = SiteMapper::new(&fetcher, &config).unwrap();

        let map = mapper.crawl(Location::root(), 5).await;

        root.assert_async().await;
        about.assert_async().await;
        research.assert_async().await;
        vision.assert_async().await;
        login.assert_async().await;
        news.assert_async().await;

        assert_eq!(map.visited.len(), 4);
        assert!(map.hashbang_routes.contains(&Location::route("faculty")));
        assert_eq!(fetcher.stats().requests, 4);
    }

    #[tokio::test]
    async fn test_depth_limits_levels() {
        let mut server = Server::new_async().await;
        let _root = server
            .mock("GET", "/")
            .with_body(r#"<a href="/about">About</a>"#)
            .create_async()
            .await;
        let about = server
            .mock("GET", "/about")
            .expect(0)
            .create_async()
            .await;

        let config = test_config(&server.url());
        let fetcher = Fetcher::with_renderer(&config, None).unwrap();
        let mapper = SiteMapper::new(&fetcher, &config).unwrap();

        let map = mapper.crawl(Location::root(), 1).await;
        about.assert_async().await;
        assert_eq!(map.visited.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_still_visited() {
        let mut server = Server::new_async().await;
        let _root = server
            .mock("GET", "/")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let config = test_config(&server.url());
        let fetcher = Fetcher::with_renderer(&config, None).unwrap();
        let mapper = SiteMapper::new(&fetcher, &config).unwrap();

        let map = mapper.crawl(Location::root(), 3).await;
        assert!(map.visited.contains(&Location::root()));
        assert_eq!(fetcher.stats().failures, 1);
    }
}
