// src/pipeline/map.rs

use crate::error::Result;
use crate::models::{Config, Location, SiteMap};
use crate::services::{Fetcher, SiteMapper};
use crate::storage::ContentStorage;
use crate::utils::log::{header, summary};

/// Explore the site from its root and persist the site map.
///
/// `depth` overrides `crawler.max_depth`.
pub async fn run_mapper(
    config: &Config,
    storage: &dyn ContentStorage,
    depth: Option<u32>,
) -> Result<SiteMap> {
    header("Site mapper starting");

    let depth = depth.unwrap_or(config.crawler.max_depth);
    let fetcher = Fetcher::open(config)?;
    let mapper = SiteMapper::new(&fetcher, config)?;

    let map = mapper.crawl(Location::root(), depth).await;
    let stats = fetcher.stats();
    fetcher.close().await;

    let path = storage.save_site_map(&map).await?;

    summary(
        "Mapper Results",
        &[
            ("Max depth", depth.to_string()),
            ("Visited", map.visited.len().to_string()),
            ("Hashbang routes", map.hashbang_routes.len().to_string()),
            ("Failed fetches", stats.failures.to_string()),
            ("Site map", path.display().to_string()),
        ],
    );

    Ok(map)
}

#[cfg(test)]
mod tests {
    use mockito::Server;
    use tempfile::TempDir;

    use super::*;
    use crate::storage::LocalStorage;

    #[tokio::test]
    async fn test_run_mapper_writes_site_map() {
        let mut server = Server::new_async().await;
        let _root = server
            .mock("GET", "/")
            .with_body(r#"<a href="/about">About</a><a href="/#!/placement">Placement</a>"#)
            .expect(1)
            .create_async()
            .await;
        let _about = server
            .mock("GET", "/about")
            .with_body("<p>About</p>")
            .expect(1)
            .create_async()
            .await;

        let mut config = Config::default();
        config.site.base_url = server.url();
        config.crawler.rate_limit_per_sec = 100;
        config.crawler.rate_burst = 10;
        config.render.enabled = false;

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), &config);

        let map = run_mapper(&config, &storage, Some(2)).await.unwrap();
        assert_eq!(map.visited.len(), 2);
        assert!(map.hashbang_routes.contains(&Location::route("placement")));

        let loaded = storage.load_site_map().await.unwrap().unwrap();
        assert_eq!(loaded, map);
    }
}
