// src/services/fetcher.rs

//! Page retrieval.
//!
//! The [`Fetcher`] owns every network resource of a run: the HTTP client, the
//! shared rate limiter, the optional headless renderer and the render cache.
//! It is opened once by the orchestrator, shared by reference between
//! workers and closed at the end of the run.
//!
//! Failures never escape as errors: a location that cannot be retrieved
//! yields `None` and a log line, and the caller decides what to do.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Client;
use tokio::sync::OnceCell;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, Document, FetchMode, Location};
use crate::services::rate_limit::FetchRateLimiter;
use crate::services::render::Renderer;
use crate::utils::http::create_async_client;

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchStats {
    /// HTTP requests sent (including hashbang fallbacks)
    pub requests: usize,
    /// Headless renders performed
    pub renders: usize,
    /// Dynamic fetches answered from the cache
    pub cache_hits: usize,
    /// Fetches that produced no document
    pub failures: usize,
}

#[derive(Default)]
struct Counters {
    requests: AtomicUsize,
    renders: AtomicUsize,
    cache_hits: AtomicUsize,
    failures: AtomicUsize,
}

type CacheCell = Arc<OnceCell<Arc<Document>>>;

/// Bounded per-run memo of dynamic fetches.
///
/// Each location gets a cell that is initialized at most once, so concurrent
/// requests for the same route share a single render. Failed renders leave
/// the cell empty. The oldest cells are evicted past `capacity`.
struct RenderCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    cells: HashMap<Location, CacheCell>,
    order: VecDeque<Location>,
}

impl RenderCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn cell(&self, location: &Location) -> CacheCell {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = inner.cells.get(location) {
            return Arc::clone(cell);
        }

        let cell = CacheCell::default();
        inner.cells.insert(location.clone(), Arc::clone(&cell));
        inner.order.push_back(location.clone());

        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.cells.remove(&evicted);
            }
        }
        cell
    }

    fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.cells.values().filter(|c| c.initialized()).count()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.cells.clear();
        inner.order.clear();
    }
}

/// Rate-limited HTTP and headless page retrieval.
pub struct Fetcher {
    base: Url,
    client: Client,
    limiter: FetchRateLimiter,
    renderer: Option<Arc<dyn Renderer>>,
    render_always: bool,
    cache: RenderCache,
    counters: Counters,
}

impl Fetcher {
    /// Open the fetcher for a run, launching the renderer when available.
    pub fn open(config: &Config) -> Result<Self> {
        Self::with_renderer(config, default_renderer(config))
    }

    /// Open the fetcher with an explicit renderer (or none).
    ///
    /// Without a renderer, dynamic fetches fall back to plain HTTP.
    pub fn with_renderer(config: &Config, renderer: Option<Arc<dyn Renderer>>) -> Result<Self> {
        Ok(Self {
            base: config.base_url()?,
            client: create_async_client(&config.crawler)?,
            limiter: FetchRateLimiter::from_config(&config.crawler)?,
            renderer,
            render_always: config.render.always,
            cache: RenderCache::new(config.render.cache_capacity),
            counters: Counters::default(),
        })
    }

    /// Site root URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Fetch a location in the mode it calls for.
    ///
    /// Hashbang routes (or every location, with `render.always`) go through
    /// the cached dynamic path; everything else is a static GET.
    pub async fn fetch(&self, location: &Location) -> Option<Arc<Document>> {
        if location.is_hashbang() || self.render_always {
            self.fetch_dynamic(location).await
        } else {
            self.fetch_static(location).await
        }
    }

    /// Plain HTTP GET, throttled by the shared rate limiter.
    pub async fn fetch_static(&self, location: &Location) -> Option<Arc<Document>> {
        match self.try_static(location).await {
            Ok(document) => Some(Arc::new(document)),
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("Static fetch failed for {}: {}", location, e);
                None
            }
        }
    }

    /// Rendered fetch, memoized for the lifetime of the run.
    ///
    /// The cache is consulted before anything touches the rate limiter.
    pub async fn fetch_dynamic(&self, location: &Location) -> Option<Arc<Document>> {
        let cell = self.cache.cell(location);
        if let Some(document) = cell.get() {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Render cache hit for {}", location);
            return Some(Arc::clone(document));
        }

        let result = cell
            .get_or_try_init(|| async {
                self.try_dynamic(location).await.map(Arc::new)
            })
            .await;

        match result {
            Ok(document) => Some(Arc::clone(document)),
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("Dynamic fetch failed for {}: {}", location, e);
                None
            }
        }
    }

    async fn try_static(&self, location: &Location) -> Result<Document> {
        let url = location.url(&self.base)?;
        log::debug!("Fetching {}", url);

        match self.get(&url).await {
            Ok((status, html)) => Ok(Document::new(
                location.clone(),
                url,
                Some(status),
                FetchMode::Static,
                html,
            )),
            Err(e @ AppError::Status { .. }) if location.is_hashbang() => {
                // Some servers only answer the base document for fragment routes.
                let fallback = location.base_document().url(&self.base)?;
                log::debug!("Hashbang fetch failed ({}), retrying {}", e, fallback);
                let (status, html) = self.get(&fallback).await?;
                Ok(Document::new(
                    location.clone(),
                    fallback,
                    Some(status),
                    FetchMode::Static,
                    html,
                ))
            }
            Err(e) => Err(e),
        }
    }

    async fn try_dynamic(&self, location: &Location) -> Result<Document> {
        let Some(renderer) = &self.renderer else {
            return self.try_static(location).await;
        };

        let url = location.url(&self.base)?;
        log::debug!("Rendering {}", url);
        self.counters.renders.fetch_add(1, Ordering::Relaxed);

        let html = renderer.render(&url).await?;
        Ok(Document::new(
            location.clone(),
            url,
            None,
            FetchMode::Dynamic,
            html,
        ))
    }

    async fn get(&self, url: &Url) -> Result<(u16, String)> {
        self.limiter.acquire().await;
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| AppError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::network(url.as_str(), e))?;
        Ok((status.as_u16(), body))
    }

    /// Number of rendered documents currently cached.
    pub fn cached_documents(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            renders: self.counters.renders.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Release the renderer and drop the run's cache.
    pub async fn close(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.close().await;
        }
        self.cache.clear();
    }
}

#[cfg(feature = "render")]
fn default_renderer(config: &Config) -> Option<Arc<dyn Renderer>> {
    use crate::services::render::ChromeRenderer;

    config.render.enabled.then(|| {
        Arc::new(ChromeRenderer::new(&config.render, &config.crawler.user_agent))
            as Arc<dyn Renderer>
    })
}

#[cfg(not(feature = "render"))]
fn default_renderer(config: &Config) -> Option<Arc<dyn Renderer>> {
    if config.render.enabled {
        log::info!("Built without the `render` feature; hashbang routes are fetched over HTTP");
    }
    None
}
