//! Application configuration structures.

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target site and link filtering rules
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Headless rendering settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Text classification thresholds and keyword lists
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Routes processed by a crawl run
    #[serde(default)]
    pub routes: RoutesConfig,

    /// Faculty directory extraction
    #[serde(default)]
    pub faculty: FacultyConfig,

    /// Output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Institutional section selector rules
    #[serde(default = "defaults::sections")]
    pub sections: Vec<SectionRule>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Parsed base URL of the target site.
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.site.base_url)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url()?;
        if base.host_str().is_none() {
            return Err(AppError::validation("site.base_url has no host"));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.rate_limit_per_sec == 0 {
            return Err(AppError::validation(
                "crawler.rate_limit_per_sec must be > 0",
            ));
        }
        if self.crawler.rate_burst == 0 {
            return Err(AppError::validation("crawler.rate_burst must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.render.max_tabs == 0 {
            return Err(AppError::validation("render.max_tabs must be > 0"));
        }
        if self.render.cache_capacity == 0 {
            return Err(AppError::validation("render.cache_capacity must be > 0"));
        }
        if self.extraction.max_walk_depth == 0 {
            return Err(AppError::validation(
                "extraction.max_walk_depth must be > 0",
            ));
        }
        if self.sections.is_empty() {
            return Err(AppError::validation("No sections defined"));
        }
        if self.faculty.rules.is_empty() {
            return Err(AppError::validation("No faculty rules defined"));
        }
        for pattern in self
            .site
            .excluded_patterns
            .iter()
            .chain(&self.routes.priority_paths)
        {
            Regex::new(pattern)?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            crawler: CrawlerConfig::default(),
            render: RenderConfig::default(),
            extraction: ExtractionConfig::default(),
            routes: RoutesConfig::default(),
            faculty: FacultyConfig::default(),
            paths: PathsConfig::default(),
            sections: defaults::sections(),
        }
    }
}

/// Target site and link filtering rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the site; its host is the only accepted host
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Institution name used in the faculty directory title
    #[serde(default = "defaults::institution")]
    pub institution: String,

    /// Reference prefixes that are never content
    #[serde(default = "defaults::disallowed_prefixes")]
    pub disallowed_prefixes: Vec<String>,

    /// Case-insensitive patterns for assets, social sites, auth and payment paths
    #[serde(default = "defaults::excluded_patterns")]
    pub excluded_patterns: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            institution: defaults::institution(),
            disallowed_prefixes: defaults::disallowed_prefixes(),
            excluded_patterns: defaults::excluded_patterns(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Static request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum static fetches per second across all workers
    #[serde(default = "defaults::rate_limit")]
    pub rate_limit_per_sec: u32,

    /// Calls allowed back-to-back before throttling kicks in
    #[serde(default = "defaults::rate_burst")]
    pub rate_burst: u32,

    /// Worker pool size
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Default depth for site mapping
    #[serde(default = "defaults::max_depth")]
    pub max_depth: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            rate_limit_per_sec: defaults::rate_limit(),
            rate_burst: defaults::rate_burst(),
            max_concurrent: defaults::max_concurrent(),
            max_depth: defaults::max_depth(),
        }
    }
}

/// Headless rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Launch a headless browser for dynamic fetches (needs the `render` feature)
    #[serde(default = "defaults::render_enabled")]
    pub enabled: bool,

    /// Render every location, not only hashbang routes
    #[serde(default)]
    pub always: bool,

    /// Minimum wait after navigation before reading the page
    #[serde(default = "defaults::settle_ms")]
    pub settle_ms: u64,

    /// Ceiling for polling the root element
    #[serde(default = "defaults::poll_ms")]
    pub poll_ms: u64,

    /// Navigation and content read timeout
    #[serde(default = "defaults::navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Element whose presence marks the page as rendered
    #[serde(default = "defaults::root_selector")]
    pub root_selector: String,

    /// Concurrent browser tabs
    #[serde(default = "defaults::max_tabs")]
    pub max_tabs: usize,

    /// Rendered documents kept for the run
    #[serde(default = "defaults::cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::render_enabled(),
            always: false,
            settle_ms: defaults::settle_ms(),
            poll_ms: defaults::poll_ms(),
            navigation_timeout_secs: defaults::navigation_timeout(),
            root_selector: defaults::root_selector(),
            max_tabs: defaults::max_tabs(),
            cache_capacity: defaults::cache_capacity(),
        }
    }
}

/// Text classification thresholds and keyword lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Paragraphs must be longer than this many characters
    #[serde(default = "defaults::paragraph_min_len")]
    pub paragraph_min_len: usize,

    /// List items and table rows must be longer than this
    #[serde(default = "defaults::list_item_min_len")]
    pub list_item_min_len: usize,

    /// Shortest text the meaningfulness test accepts
    #[serde(default = "defaults::meaningful_min_len")]
    pub meaningful_min_len: usize,

    /// Nesting depth beyond which the text walk stops descending
    #[serde(default = "defaults::max_walk_depth")]
    pub max_walk_depth: usize,

    /// Walk the whole body when no section selector matched
    #[serde(default = "defaults::fallback_text_walk")]
    pub fallback_text_walk: bool,

    /// Tags whose direct text the walk collects
    #[serde(default = "defaults::text_bearing_tags")]
    pub text_bearing_tags: Vec<String>,

    /// UI chrome phrases that disqualify a string
    #[serde(default = "defaults::ignore_phrases")]
    pub ignore_phrases: Vec<String>,

    /// Domain keywords, at least one of which must be present
    #[serde(default = "defaults::content_indicators")]
    pub content_indicators: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            paragraph_min_len: defaults::paragraph_min_len(),
            list_item_min_len: defaults::list_item_min_len(),
            meaningful_min_len: defaults::meaningful_min_len(),
            max_walk_depth: defaults::max_walk_depth(),
            fallback_text_walk: defaults::fallback_text_walk(),
            text_bearing_tags: defaults::text_bearing_tags(),
            ignore_phrases: defaults::ignore_phrases(),
            content_indicators: defaults::content_indicators(),
        }
    }
}

/// Routes processed by a crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// Sections written with a `Section:` header, processed first
    #[serde(default = "defaults::priority_sections")]
    pub priority_sections: Vec<String>,

    /// Further endpoints, written without a section label
    #[serde(default = "defaults::remaining_routes")]
    pub remaining_routes: Vec<String>,

    /// Path patterns a normal link must match to join the frontier
    #[serde(default = "defaults::priority_paths")]
    pub priority_paths: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            priority_sections: defaults::priority_sections(),
            remaining_routes: defaults::remaining_routes(),
            priority_paths: defaults::priority_paths(),
        }
    }
}

/// Faculty directory extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacultyConfig {
    /// Run faculty extraction as part of a crawl
    #[serde(default = "defaults::faculty_enabled")]
    pub enabled: bool,

    /// Route of the faculty listing page
    #[serde(default = "defaults::faculty_route")]
    pub route: String,

    /// Selectors for individual profile elements, tried in order
    #[serde(default = "defaults::profile_selectors")]
    pub profile_selectors: Vec<String>,

    /// Ordered field rules; the first match wins
    #[serde(default = "defaults::faculty_rules")]
    pub rules: Vec<FieldRule>,
}

impl Default for FacultyConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::faculty_enabled(),
            route: defaults::faculty_route(),
            profile_selectors: defaults::profile_selectors(),
            rules: defaults::faculty_rules(),
        }
    }
}

/// Output locations, relative to the storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory receiving one text file per section/endpoint
    #[serde(default = "defaults::content_dir")]
    pub content_dir: String,

    /// Aggregate faculty directory file inside the content directory
    #[serde(default = "defaults::faculty_file")]
    pub faculty_file: String,

    /// Site map written by the mapper
    #[serde(default = "defaults::sitemap_file")]
    pub sitemap_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content_dir: defaults::content_dir(),
            faculty_file: defaults::faculty_file(),
            sitemap_file: defaults::sitemap_file(),
        }
    }
}

/// Selector hints for one institutional section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRule {
    /// Section name (e.g., "about")
    pub name: String,

    /// CSS selectors locating the section's containers
    pub selectors: Vec<String>,
}

/// Target field of a faculty classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacultyField {
    Name,
    Designation,
    Qualifications,
    Email,
    ResearchInterests,
    Specializations,
    Publications,
    AdditionalInfo,
}

impl FacultyField {
    /// Human-readable label used in the faculty directory file.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Designation => "Designation",
            Self::Qualifications => "Qualifications",
            Self::Email => "Email",
            Self::ResearchInterests => "Research Interests",
            Self::Specializations => "Specializations",
            Self::Publications => "Publications",
            Self::AdditionalInfo => "Additional Information",
        }
    }
}

/// Keyword rule routing a text fragment into a faculty field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    /// Field populated when the rule matches
    pub field: FacultyField,

    /// Lowercase substrings; any one of them matches
    pub keywords: Vec<String>,
}

impl FieldRule {
    pub fn new(field: FacultyField, keywords: &[&str]) -> Self {
        Self {
            field,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Check a lowercased fragment against the rule.
    pub fn matches(&self, lower_text: &str) -> bool {
        self.keywords.iter().any(|k| lower_text.contains(k.as_str()))
    }
}

mod defaults {
    use super::{FacultyField, FieldRule, SectionRule};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // Site defaults
    pub fn base_url() -> String {
        "https://iiitkottayam.ac.in".into()
    }
    pub fn institution() -> String {
        "IIIT Kottayam".into()
    }
    pub fn disallowed_prefixes() -> Vec<String> {
        strings(&[
            "javascript:",
            "mailto:",
            "tel:",
            "data:",
            "about:",
            "file:",
            "{",
            "%7B",
        ])
    }
    pub fn excluded_patterns() -> Vec<String> {
        strings(&[
            r"\.(?:css|js|json|xml|jpg|jpeg|png|gif|pdf|ico|woff|woff2|ttf|eot)$",
            r"(?:youtube|twitter|x\.com|facebook|linkedin|instagram)",
            r"(?:api|assets|static|cdn|media|images)/",
            r"(?:payment|sbi|collect|gateway)",
            r"(?:login|logout|auth|signup|register)",
        ])
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; campus-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        5
    }
    pub fn rate_limit() -> u32 {
        3
    }
    pub fn rate_burst() -> u32 {
        1
    }
    pub fn max_concurrent() -> usize {
        12
    }
    pub fn max_depth() -> u32 {
        2
    }

    // Render defaults
    pub fn render_enabled() -> bool {
        true
    }
    pub fn settle_ms() -> u64 {
        1000
    }
    pub fn poll_ms() -> u64 {
        2000
    }
    pub fn navigation_timeout() -> u64 {
        15
    }
    pub fn root_selector() -> String {
        "body".into()
    }
    pub fn max_tabs() -> usize {
        1
    }
    pub fn cache_capacity() -> usize {
        100
    }

    // Extraction defaults
    pub fn paragraph_min_len() -> usize {
        20
    }
    pub fn list_item_min_len() -> usize {
        10
    }
    pub fn meaningful_min_len() -> usize {
        3
    }
    pub fn max_walk_depth() -> usize {
        256
    }
    pub fn fallback_text_walk() -> bool {
        true
    }
    pub fn text_bearing_tags() -> Vec<String> {
        strings(&[
            "p", "div", "span", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "a",
            "label", "strong", "em", "i", "b", "article", "section", "main", "aside", "footer",
            "header", "blockquote", "cite", "pre", "code", "small", "time", "address",
            "figcaption", "dt", "dd",
        ])
    }
    pub fn ignore_phrases() -> Vec<String> {
        strings(&["next", "previous", "menu", "close", "open", "click", "loading"])
    }
    pub fn content_indicators() -> Vec<String> {
        strings(&[
            "professor",
            "faculty",
            "research",
            "interests",
            "specialization",
            "education",
            "qualification",
            "experience",
            "publications",
            "projects",
            "teaching",
            "courses",
            "expertise",
            "department",
            "contact",
            "email",
            "phone",
            "office",
            "lab",
            "group",
            "awards",
            "recognition",
        ])
    }

    // Route defaults
    pub fn priority_sections() -> Vec<String> {
        strings(&["home", "about", "research", "academics", "faculty"])
    }
    pub fn remaining_routes() -> Vec<String> {
        strings(&[
            "admissions",
            "programmes",
            "department",
            "placement",
            "infrastructure",
            "contact",
        ])
    }
    pub fn priority_paths() -> Vec<String> {
        strings(&[
            r"^/$",
            r"/about",
            r"/academics",
            r"/admission",
            r"/department",
            r"/faculty",
            r"/research",
            r"/placement",
            r"/programmes",
            r"/infrastructure",
        ])
    }

    // Faculty defaults
    pub fn faculty_enabled() -> bool {
        true
    }
    pub fn faculty_route() -> String {
        "faculty".into()
    }
    pub fn profile_selectors() -> Vec<String> {
        strings(&[
            ".faculty-profile",
            ".faculty-info",
            ".faculty-details",
            ".profile-card",
            "#faculty-list .member",
            ".faculty-member",
            "[class*=\"faculty\"]",
            ".profile-container",
        ])
    }
    pub fn faculty_rules() -> Vec<FieldRule> {
        vec![
            FieldRule::new(FacultyField::Name, &["dr.", "prof."]),
            FieldRule::new(
                FacultyField::Designation,
                &["professor", "assistant", "associate", "head"],
            ),
            FieldRule::new(
                FacultyField::Qualifications,
                &["phd", "ph.d", "m.tech", "b.tech"],
            ),
            FieldRule::new(FacultyField::Email, &["@"]),
            FieldRule::new(FacultyField::ResearchInterests, &["research", "interests"]),
            FieldRule::new(FacultyField::Specializations, &["specialization"]),
            FieldRule::new(
                FacultyField::Publications,
                &["publication", "journal", "conference"],
            ),
        ]
    }

    // Path defaults
    pub fn content_dir() -> String {
        "content".into()
    }
    pub fn faculty_file() -> String {
        "faculty_directory.txt".into()
    }
    pub fn sitemap_file() -> String {
        "sitemap.json".into()
    }

    // Section defaults
    fn section(name: &str, selectors: &[&str]) -> SectionRule {
        SectionRule {
            name: name.to_string(),
            selectors: strings(selectors),
        }
    }
    pub fn sections() -> Vec<SectionRule> {
        vec![
            section(
                "home",
                &[
                    ".home-content",
                    "#home-banner",
                    ".institute-highlights",
                    ".news-updates",
                    ".announcements",
                ],
            ),
            section(
                "about",
                &[
                    "#about-institute",
                    ".about-content",
                    ".vision-mission",
                    ".director-message",
                ],
            ),
            section(
                "academics",
                &[
                    "#academic-programs",
                    ".course-details",
                    ".program-structure",
                    ".curriculum",
                ],
            ),
            section(
                "research",
                &[
                    "#research-areas",
                    ".research-highlights",
                    ".publications",
                    ".projects",
                    ".laboratories",
                ],
            ),
            section(
                "faculty",
                &[
                    "#faculty-list",
                    ".faculty-profile",
                    ".department-faculty",
                    ".faculty-research",
                ],
            ),
            section(
                "admissions",
                &[
                    "#admission-process",
                    ".eligibility-criteria",
                    ".how-to-apply",
                    ".important-dates",
                ],
            ),
        ]
    }
}
