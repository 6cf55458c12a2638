// src/pipeline/crawl.rs

//! Content crawling pipeline.
//!
//! A run schedules one task per priority section, one per remaining route
//! (plus discovered routes when asked) and one for the faculty directory,
//! and drives them through a bounded worker pool. Task failures are
//! reported, never propagated to siblings.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use futures::{StreamExt, stream};

use crate::error::{AppError, Result};
use crate::models::{Config, FetchMode, Location, SiteMap};
use crate::services::{FacultyExtractor, FetchStats, Fetcher, SectionExtractor, UrlNormalizer};
use crate::storage::{ContentHeader, ContentStorage};
use crate::utils::log::{header, step, summary};

/// Options for a crawl run.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Also process routes recorded in the stored site map
    pub discover: bool,
}

/// One section or endpoint to fetch, extract and save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTask {
    /// Output file stem
    pub name: String,
    pub location: Location,
    /// Section label for the file header; endpoints have none
    pub label: Option<String>,
}

impl SectionTask {
    fn header(&self, base: &url::Url) -> Result<ContentHeader> {
        let url = self.location.url(base)?.to_string();
        Ok(match &self.label {
            Some(label) => ContentHeader::section(url, label),
            None => ContentHeader::endpoint(url),
        })
    }
}

/// Result of a single task.
#[derive(Debug)]
pub enum TaskOutcome {
    /// A file was written
    Written(PathBuf),
    /// The page was fetched but nothing was extracted
    Empty,
    /// The task could not complete
    Failed(AppError),
}

/// Totals for a crawl run.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub written: Vec<PathBuf>,
    pub empty: usize,
    pub failed: usize,
    pub faculty_records: usize,
    pub fetch: FetchStats,
}

impl CrawlSummary {
    fn record(&mut self, name: &str, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Written(path) => self.written.push(path),
            TaskOutcome::Empty => {
                log::info!("No content found for: {}", name);
                self.empty += 1;
            }
            TaskOutcome::Failed(e) => {
                if e.is_recoverable() {
                    log::warn!("Skipped {}: {}", name, e);
                } else {
                    log::error!("Error processing {}: {}", name, e);
                }
                self.failed += 1;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.empty + self.failed
    }

    /// Whether there was work and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.failed == self.total()
    }
}

enum Task {
    Section(SectionTask),
    Invalid { route: String, error: AppError },
    Faculty(Location),
}

impl Task {
    fn name(&self) -> String {
        match self {
            Self::Section(task) => task.name.clone(),
            Self::Invalid { route, .. } => format!("route '{route}'"),
            Self::Faculty(_) => "faculty directory".to_string(),
        }
    }
}

/// Resolve a configured route name to its hashbang location.
pub fn resolve_route(normalizer: &UrlNormalizer, route: &str) -> Result<Location> {
    let route = route.trim().trim_matches('/');
    if route.is_empty() {
        return Err(AppError::InvalidLocation("empty route".to_string()));
    }
    normalizer
        .normalize(&format!("#!/{route}"))
        .filter(Location::is_hashbang)
        .ok_or_else(|| AppError::InvalidLocation(route.to_string()))
}

/// Section and endpoint tasks for a run, in scheduling order, each paired
/// with the route it was planned from.
///
/// Discovered routes whose file name is already taken are skipped.
pub fn plan_tasks(
    config: &Config,
    normalizer: &UrlNormalizer,
    discovered: Option<&SiteMap>,
) -> Vec<(String, Result<SectionTask>)> {
    let mut names = HashSet::new();
    let mut tasks = Vec::new();

    let configured = config
        .routes
        .priority_sections
        .iter()
        .map(|name| (name, true))
        .chain(config.routes.remaining_routes.iter().map(|name| (name, false)));

    for (route, labelled) in configured {
        let task = resolve_route(normalizer, route).map(|location| SectionTask {
            name: location.file_stem(),
            label: labelled.then(|| route.trim().trim_matches('/').to_string()),
            location,
        });
        if let Ok(task) = &task {
            if !names.insert(task.name.clone()) {
                continue;
            }
        }
        tasks.push((route.clone(), task));
    }

    if let Some(map) = discovered {
        let candidates = map
            .hashbang_routes
            .iter()
            .chain(map.visited.iter().filter(|loc| **loc != Location::root()));

        for location in candidates {
            let name = location.file_stem();
            if names.insert(name.clone()) {
                let task = SectionTask {
                    name,
                    location: location.clone(),
                    label: None,
                };
                tasks.push((location.to_string(), Ok(task)));
            }
        }
    }

    tasks
}

/// Fetch, extract and save one section or endpoint.
///
/// A hashbang route fetched without a renderer comes back as the site's
/// shared base document. Only the section named after the route is taken
/// from it, so routes do not all receive copies of the same page.
///
/// Returns `Ok(None)` when the page yielded no content.
pub async fn process_section(
    fetcher: &Fetcher,
    extractor: &SectionExtractor,
    storage: &dyn ContentStorage,
    task: &SectionTask,
) -> Result<Option<PathBuf>> {
    log::info!("Processing endpoint: {}", task.location);

    let document = fetcher
        .fetch(&task.location)
        .await
        .ok_or_else(|| AppError::crawl(task.location.to_string(), "no document retrieved"))?;

    let items = if document.mode == FetchMode::Static && task.location.is_hashbang() {
        let section = task.location.file_stem();
        log::debug!("{} served the base document; keeping section '{}'", task.location, section);
        extractor.extract_named_section(&document, &section)
    } else {
        extractor.extract_sections(&document)
    };
    if items.is_empty() {
        log::debug!("{}", AppError::ExtractionEmpty(task.location.to_string()));
        return Ok(None);
    }

    let header = task.header(fetcher.base())?;
    storage.save_section(&task.name, &header, &items).await
}

/// Fetch the faculty listing, extract every profile and save the directory.
///
/// Returns the number of records and the written path.
pub async fn process_faculty(
    fetcher: &Fetcher,
    extractor: &Arc<FacultyExtractor>,
    storage: &dyn ContentStorage,
    location: &Location,
    concurrency: usize,
) -> Result<(usize, Option<PathBuf>)> {
    log::info!("Starting faculty data extraction...");

    let document = fetcher
        .fetch(location)
        .await
        .ok_or_else(|| AppError::crawl(location.to_string(), "no document retrieved"))?;

    let records = extractor.extract_all(&document, concurrency).await;
    let path = storage.save_faculty(&records).await?;
    Ok((records.len(), path))
}

/// Run a full crawl with a freshly opened fetcher.
pub async fn run_crawler(
    config: &Config,
    storage: &dyn ContentStorage,
    options: &CrawlOptions,
) -> Result<CrawlSummary> {
    let fetcher = Fetcher::open(config)?;
    let result = crawl_with(config, &fetcher, storage, options).await;
    fetcher.close().await;
    result
}

/// Run a full crawl with the given fetcher. The caller closes it.
pub async fn crawl_with(
    config: &Config,
    fetcher: &Fetcher,
    storage: &dyn ContentStorage,
    options: &CrawlOptions,
) -> Result<CrawlSummary> {
    let start_time = Utc::now();
    header("Campus crawler starting");

    let normalizer = UrlNormalizer::new(&config.site)?;
    let sections = SectionExtractor::new(config)?;
    let faculty = Arc::new(FacultyExtractor::new(config)?);
    let concurrency = config.crawler.max_concurrent.max(1);

    let discovered = if options.discover {
        let map = storage.load_site_map().await?;
        if map.is_none() {
            log::warn!("No site map found; run 'map' first to discover routes");
        }
        map
    } else {
        None
    };

    step(1, 2, "Planning tasks");
    let mut tasks: Vec<Task> = plan_tasks(config, &normalizer, discovered.as_ref())
        .into_iter()
        .map(|(route, planned)| match planned {
            Ok(task) => Task::Section(task),
            Err(error) => Task::Invalid { route, error },
        })
        .collect();

    if config.faculty.enabled {
        tasks.push(match resolve_route(&normalizer, &config.faculty.route) {
            Ok(location) => Task::Faculty(location),
            Err(error) => Task::Invalid {
                route: config.faculty.route.clone(),
                error,
            },
        });
    }
    log::info!("Scheduled {} task(s)", tasks.len());

    step(2, 2, "Processing sections and endpoints");
    let reports: Vec<(String, TaskOutcome, usize)> = stream::iter(tasks)
        .map(|task| {
            let sections = &sections;
            let faculty = &faculty;
            async move {
                let name = task.name();
                let (outcome, records) = match task {
                    Task::Section(task) => {
                        let result = process_section(fetcher, sections, storage, &task).await;
                        (outcome_of(result), 0)
                    }
                    Task::Invalid { error, .. } => (TaskOutcome::Failed(error), 0),
                    Task::Faculty(location) => {
                        match process_faculty(fetcher, faculty, storage, &location, concurrency)
                            .await
                        {
                            Ok((count, path)) => (outcome_of(Ok(path)), count),
                            Err(e) => (TaskOutcome::Failed(e), 0),
                        }
                    }
                };
                (name, outcome, records)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut result = CrawlSummary::default();
    for (name, outcome, records) in reports {
        result.faculty_records += records;
        result.record(&name, outcome);
    }
    result.fetch = fetcher.stats();

    let elapsed = Utc::now() - start_time;
    summary(
        "Crawl Results",
        &[
            ("Files written", result.written.len().to_string()),
            ("Empty", result.empty.to_string()),
            ("Failed", result.failed.to_string()),
            ("Faculty members", result.faculty_records.to_string()),
            ("HTTP requests", result.fetch.requests.to_string()),
            ("Renders", result.fetch.renders.to_string()),
            ("Elapsed", format!("{}s", elapsed.num_seconds())),
        ],
    );

    if result.all_failed() {
        return Err(AppError::crawl("run", "every task failed"));
    }
    Ok(result)
}

fn outcome_of(result: Result<Option<PathBuf>>) -> TaskOutcome {
    match result {
        Ok(Some(path)) => TaskOutcome::Written(path),
        Ok(None) => TaskOutcome::Empty,
        Err(e) => TaskOutcome::Failed(e),
    }
}

/// Process a single route by name.
///
/// Priority section names get a section label. An unusable route name is an
/// error here rather than a logged skip.
pub async fn run_section(
    config: &Config,
    storage: &dyn ContentStorage,
    route: &str,
) -> Result<Option<PathBuf>> {
    let normalizer = UrlNormalizer::new(&config.site)?;
    let location = resolve_route(&normalizer, route)?;
    let route = route.trim().trim_matches('/');
    let labelled = config.routes.priority_sections.iter().any(|s| s == route);

    let task = SectionTask {
        name: location.file_stem(),
        label: labelled.then(|| route.to_string()),
        location,
    };

    let fetcher = Fetcher::open(config)?;
    let extractor = SectionExtractor::new(config)?;
    let result = process_section(&fetcher, &extractor, storage, &task).await;
    fetcher.close().await;
    result
}

/// Extract and save the faculty directory only.
pub async fn run_faculty(config: &Config, storage: &dyn ContentStorage) -> Result<usize> {
    let normalizer = UrlNormalizer::new(&config.site)?;
    let location = resolve_route(&normalizer, &config.faculty.route)?;
    let extractor = Arc::new(FacultyExtractor::new(config)?);

    let fetcher = Fetcher::open(config)?;
    let result = process_faculty(
        &fetcher,
        &extractor,
        storage,
        &location,
        config.crawler.max_concurrent,
    )
    .await;
    fetcher.close().await;

    let (count, _) = result?;
    log::info!("Extracted {} faculty record(s)", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::services::{Renderer, StubRenderer};
    use crate::storage::LocalStorage;

    const ABOUT_PARAGRAPH: &str = "IIIT Kottayam was established in 2015 AD";

    fn test_config() -> Config {
        let mut config = Config::default();
        config.site.base_url = "https://campus.test".to_string();
        config.crawler.rate_limit_per_sec = 100;
        config.crawler.rate_burst = 10;
        config.render.enabled = false;
        config.routes.priority_sections = vec!["about".to_string(), "research".to_string()];
        config.routes.remaining_routes = vec!["contact".to_string()];
        config.faculty.enabled = false;
        config
    }

    fn fetcher_with(config: &Config, stub: StubRenderer) -> Fetcher {
        Fetcher::with_renderer(config, Some(Arc::new(stub) as Arc<dyn Renderer>)).unwrap()
    }

    fn content_files(storage: &LocalStorage) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(storage.content_dir())
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().into_string().unwrap())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_single_section_site() {
        assert_eq!(ABOUT_PARAGRAPH.len(), 40);

        let config = test_config();
        let stub = StubRenderer::with_page(
            "https://campus.test/#!/about",
            &format!(
                r#"<html><body><div class="about-content"><p>{ABOUT_PARAGRAPH}</p></div></body></html>"#
            ),
        );
        stub.pages.lock().unwrap().insert(
            "https://campus.test/#!/research".to_string(),
            "<html><body></body></html>".to_string(),
        );
        let fetcher = fetcher_with(&config, stub);
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), &config);

        let summary = crawl_with(&config, &fetcher, &storage, &CrawlOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(content_files(&storage), vec!["about.txt"]);

        let text = std::fs::read_to_string(storage.section_path("about")).unwrap();
        assert!(text.starts_with("URL: https://campus.test/#!/about\nSection: ABOUT\nTimestamp: "));
        let item_lines: Vec<_> = text.lines().filter(|l| l.starts_with('[')).collect();
        assert_eq!(item_lines, vec![format!("[P] {ABOUT_PARAGRAPH}")]);
    }

    #[tokio::test]
    async fn test_shared_base_document_written_once() {
        let mut server = mockito::Server::new_async().await;
        let _root = server
            .mock("GET", "/")
            .with_body(format!(
                r#"<html><head><title>IIIT Kottayam</title></head><body>
                     <div class="about-content"><p>{ABOUT_PARAGRAPH}</p></div>
                   </body></html>"#
            ))
            .create_async()
            .await;

        let mut config = test_config();
        config.site.base_url = server.url();
        let fetcher = Fetcher::with_renderer(&config, None).unwrap();
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), &config);

        let summary = crawl_with(&config, &fetcher, &storage, &CrawlOptions::default())
            .await
            .unwrap();

        assert_eq!(content_files(&storage), vec!["about.txt"]);
        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.empty, 2);

        let text = std::fs::read_to_string(storage.section_path("about")).unwrap();
        let item_lines: Vec<_> = text.lines().filter(|l| l.starts_with('[')).collect();
        assert_eq!(item_lines, vec![format!("[P] {ABOUT_PARAGRAPH}")]);
    }

    #[test]
    fn test_invalid_task_names_its_route() {
        let task = Task::Invalid {
            route: "login".to_string(),
            error: AppError::InvalidLocation("login".to_string()),
        };
        assert_eq!(task.name(), "route 'login'");
    }

    #[tokio::test]
    async fn test_run_fails_when_every_task_fails() {
        let mut config = test_config();
        config.routes.priority_sections = vec!["about".to_string()];
        config.routes.remaining_routes.clear();

        let fetcher = fetcher_with(&config, StubRenderer::default());
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), &config);

        let result = crawl_with(&config, &fetcher, &storage, &CrawlOptions::default()).await;
        assert!(result.is_err());
        assert!(content_files(&storage).is_empty());
    }

    #[tokio::test]
    async fn test_faculty_directory_task() {
        let mut config = test_config();
        config.routes.priority_sections.clear();
        config.routes.remaining_routes.clear();
        config.faculty.enabled = true;

        let stub = StubRenderer::with_page(
            "https://campus.test/#!/faculty",
            r#"<html><body><div id="faculty-list">
                 <div class="faculty-profile"><h3>Dr. Jane Doe</h3><p>Associate Professor</p></div>
                 <div class="faculty-profile"><h3>Prof. John Roe</h3><p>jroe@campus.test</p></div>
               </div></body></html>"#,
        );
        let fetcher = fetcher_with(&config, stub);
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), &config);

        let summary = crawl_with(&config, &fetcher, &storage, &CrawlOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.faculty_records, 2);
        let text = std::fs::read_to_string(storage.faculty_path()).unwrap();
        assert!(text.contains("Total Faculty Members: 2"));
        assert!(text.contains("Designation: Associate Professor"));
        assert!(text.contains("Email: jroe@campus.test"));
    }

    #[test]
    fn test_plan_tasks_with_discovery() {
        let mut config = test_config();
        config.routes.priority_sections = vec!["about".to_string()];
        config.routes.remaining_routes = vec!["placement".to_string(), "login".to_string()];
        let normalizer = UrlNormalizer::new(&config.site).unwrap();

        let mut map = SiteMap::new(Location::root(), 2);
        map.visited.insert(Location::root());
        map.visited.insert(Location::new("/about", None));
        map.hashbang_routes.insert(Location::route("placement"));
        map.hashbang_routes.insert(Location::route("news"));

        let tasks = plan_tasks(&config, &normalizer, Some(&map));
        assert_eq!(tasks.len(), 4);

        let about = tasks[0].1.as_ref().unwrap();
        assert_eq!(about.name, "about");
        assert_eq!(about.label.as_deref(), Some("about"));

        let placement = tasks[1].1.as_ref().unwrap();
        assert_eq!(placement.label, None);

        assert_eq!(tasks[2].0, "login");
        assert!(matches!(tasks[2].1, Err(AppError::InvalidLocation(_))));
        assert_eq!(tasks[3].1.as_ref().unwrap().location, Location::route("news"));
    }

    #[tokio::test]
    async fn test_run_section_rejects_invalid_route() {
        let config = test_config();
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), &config);

        let result = run_section(&config, &storage, "login").await;
        assert!(matches!(result, Err(AppError::InvalidLocation(_))));
    }
}
