// src/services/render.rs

//! Headless rendering of client-side routes.
//!
//! The [`Renderer`] trait is the seam between the fetcher and whatever
//! executes page scripts. With the `render` feature, [`ChromeRenderer`]
//! drives a single shared headless Chrome instance.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Produces the post-script markup of a page.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to `url`, wait for it to settle and return the rendered HTML.
    async fn render(&self, url: &Url) -> Result<String>;

    /// Release browser resources. Called once at the end of a run.
    async fn close(&self) {}
}

#[cfg(feature = "render")]
pub use chrome::ChromeRenderer;

#[cfg(feature = "render")]
mod chrome {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::Page;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use tokio::sync::{Mutex, Semaphore};
    use tokio::time::{Instant, sleep, timeout};
    use url::Url;

    use super::Renderer;
    use crate::error::{AppError, Result};
    use crate::models::RenderConfig;

    /// Interval between root element checks.
    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Await a navigation for at most `limit`.
    ///
    /// Running out of time is logged and treated as done: the page is read
    /// as it stands. A navigation error is returned.
    async fn navigate_within<T, E, F>(navigation: F, limit: Duration, url: &Url) -> Result<()>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(limit, navigation).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::render(url.as_str(), e)),
            Err(_) => {
                log::warn!(
                    "Navigation to {} exceeded {:?}, reading partial content",
                    url,
                    limit
                );
                Ok(())
            }
        }
    }

    /// Run `read`, then `release` whatever the read returned.
    async fn read_then_release<T>(
        read: impl Future<Output = Result<T>>,
        release: impl Future<Output = ()>,
    ) -> Result<T> {
        let result = read.await;
        release.await;
        result
    }

    /// Lazily launched headless Chrome shared by all workers.
    ///
    /// The browser is one process; concurrent navigation is bounded by a tab
    /// semaphore (`render.max_tabs`, 1 by default).
    pub struct ChromeRenderer {
        browser: Mutex<Option<Arc<Browser>>>,
        tabs: Semaphore,
        config: RenderConfig,
        user_agent: String,
    }

    impl ChromeRenderer {
        pub fn new(config: &RenderConfig, user_agent: &str) -> Self {
            Self {
                browser: Mutex::new(None),
                tabs: Semaphore::new(config.max_tabs.max(1)),
                config: config.clone(),
                user_agent: user_agent.to_string(),
            }
        }

        async fn get_or_launch(&self) -> Result<Arc<Browser>> {
            let mut guard = self.browser.lock().await;
            if let Some(ref browser) = *guard {
                return Ok(Arc::clone(browser));
            }

            let browser_config = BrowserConfig::builder()
                .arg("--disable-gpu")
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage")
                .arg(format!("--user-agent={}", self.user_agent))
                .build()
                .map_err(|e| AppError::config(format!("Browser config error: {e}")))?;

            let (browser, mut handler) = Browser::launch(browser_config)
                .await
                .map_err(|e| AppError::render("browser", format!("launch failed: {e}")))?;

            tokio::spawn(async move { while handler.next().await.is_some() {} });
            log::info!("Headless browser launched");

            let shared = Arc::new(browser);
            *guard = Some(Arc::clone(&shared));
            Ok(shared)
        }

        /// Navigate an open tab and read its markup.
        async fn read_page(&self, page: &Page, url: &Url) -> Result<String> {
            let nav_secs = self.config.navigation_timeout_secs;
            let nav_timeout = Duration::from_secs(nav_secs);

            navigate_within(page.goto(url.as_str()), nav_timeout, url).await?;

            sleep(Duration::from_millis(self.config.settle_ms)).await;

            // Capped poll for the root element; proceed with whatever is there.
            let deadline = Instant::now() + Duration::from_millis(self.config.poll_ms);
            loop {
                if page
                    .find_element(self.config.root_selector.as_str())
                    .await
                    .is_ok()
                {
                    break;
                }
                if Instant::now() >= deadline {
                    log::debug!(
                        "Root element '{}' not found for {}, reading page anyway",
                        self.config.root_selector,
                        url
                    );
                    break;
                }
                sleep(POLL_INTERVAL).await;
            }

            timeout(nav_timeout, page.content())
                .await
                .map_err(|_| AppError::RenderTimeout {
                    url: url.to_string(),
                    secs: nav_secs,
                })?
                .map_err(|e| AppError::render(url.as_str(), e))
        }
    }

    #[async_trait]
    impl Renderer for ChromeRenderer {
        async fn render(&self, url: &Url) -> Result<String> {
            let _tab = self
                .tabs
                .acquire()
                .await
                .map_err(|e| AppError::render(url.as_str(), e))?;
            let browser = self.get_or_launch().await?;
            let nav_secs = self.config.navigation_timeout_secs;
            let nav_timeout = Duration::from_secs(nav_secs);

            let page = timeout(nav_timeout, browser.new_page("about:blank"))
                .await
                .map_err(|_| AppError::RenderTimeout {
                    url: url.to_string(),
                    secs: nav_secs,
                })?
                .map_err(|e| AppError::render(url.as_str(), e))?;

            let tab = page.clone();
            read_then_release(self.read_page(&page, url), async move {
                if let Err(e) = tab.close().await {
                    log::debug!("Page close error for {}: {}", url, e);
                }
            })
            .await
        }

        async fn close(&self) {
            let mut guard = self.browser.lock().await;
            if let Some(browser) = guard.take() {
                match Arc::try_unwrap(browser) {
                    Ok(mut browser) => {
                        if let Err(e) = browser.close().await {
                            log::warn!("Browser close error: {}", e);
                        }
                        let _ = browser.wait().await;
                        log::info!("Headless browser closed");
                    }
                    Err(_) => log::warn!("Browser still in use at shutdown"),
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use std::sync::atomic::{AtomicBool, Ordering};

        use super::*;

        fn url() -> Url {
            Url::parse("https://campus.test/#!/about").unwrap()
        }

        #[tokio::test]
        async fn test_slow_navigation_still_reads_page() {
            let stalled = std::future::pending::<std::result::Result<(), String>>();
            let result = navigate_within(stalled, Duration::from_millis(20), &url()).await;
            assert!(result.is_ok());
        }

        #[tokio::test]
        async fn test_navigation_error_is_render_failure() {
            let failed = async { Err::<(), _>("net::ERR_NAME_NOT_RESOLVED") };
            let result = navigate_within(failed, Duration::from_secs(1), &url()).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_tab_released_after_read_timeout() {
            let released = AtomicBool::new(false);
            let read = async {
                timeout(
                    Duration::from_millis(20),
                    std::future::pending::<Result<String>>(),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(AppError::RenderTimeout {
                        url: url().to_string(),
                        secs: 0,
                    })
                })
            };

            let result = read_then_release(read, async {
                released.store(true, Ordering::SeqCst);
            })
            .await;

            assert!(matches!(result, Err(AppError::RenderTimeout { .. })));
            assert!(released.load(Ordering::SeqCst));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::AppError;

    /// Renderer serving canned pages and counting calls.
    #[derive(Default)]
    pub(crate) struct StubRenderer {
        pub pages: Mutex<HashMap<String, String>>,
        pub calls: AtomicUsize,
    }

    impl StubRenderer {
        pub(crate) fn with_page(url: &str, html: &str) -> Self {
            let stub = Self::default();
            stub.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), html.to_string());
            stub
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        async fn render(&self, url: &Url) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .lock()
                .unwrap()
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| AppError::RenderTimeout {
                    url: url.to_string(),
                    secs: 0,
                })
        }
    }

    #[tokio::test]
    async fn test_stub_renderer_counts_calls() {
        let stub = StubRenderer::with_page("https://a.test/#!/x", "<p>x</p>");
        let url = Url::parse("https://a.test/#!/x").unwrap();
        assert_eq!(stub.render(&url).await.unwrap(), "<p>x</p>");
        assert!(stub.render(&Url::parse("https://a.test/").unwrap()).await.is_err());
        assert_eq!(stub.call_count(), 2);
    }
}
