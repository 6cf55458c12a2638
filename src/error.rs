// src/error.rs

//! Unified error handling for the crawler application.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regular expression failed to compile
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Static fetch failed before a response arrived
    #[error("Network failure for {url}: {message}")]
    Network { url: String, message: String },

    /// Server answered with a non-2xx status
    #[error("Network failure for {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// Headless navigation did not settle in time
    #[error("Render timed out for {url} after {secs}s")]
    RenderTimeout { url: String, secs: u64 },

    /// Headless browser failure other than a timeout
    #[error("Render error for {url}: {message}")]
    Render { url: String, message: String },

    /// Reference failed normalization or validation
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Page fetched but nothing matched any extraction rule
    #[error("No content extracted for {0}")]
    ExtractionEmpty(String),

    /// Writing or backing up an output file failed
    #[error("Persistence failure at {path}: {message}")]
    Persistence { path: String, message: String },

    /// Crawling error
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a network failure for a URL.
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a render error for a URL.
    pub fn render(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Render {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence failure for a path.
    pub fn persistence(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error only means "no content for this location".
    ///
    /// Fetch-level failures are recovered locally and never abort a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Status { .. }
                | Self::RenderTimeout { .. }
                | Self::Render { .. }
                | Self::Http(_)
                | Self::ExtractionEmpty(_)
        )
    }
}
