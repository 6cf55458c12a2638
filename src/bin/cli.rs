//! Campus crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use campus_crawler::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, CrawlOptions},
    storage::LocalStorage,
};
use clap::{Parser, Subcommand};

/// Campus crawler - institutional website to plain-text knowledge base
#[derive(Parser, Debug)]
#[command(
    name = "campus-crawler",
    version,
    about = "Crawls a hashbang-routed campus website into plain-text files"
)]
struct Cli {
    /// Path to storage directory containing config.toml and output
    #[arg(short, long, default_value = "data")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract all configured sections, routes and the faculty directory
    Crawl {
        /// Map the site first with this depth
        #[arg(long)]
        depth: Option<u32>,

        /// Also process routes from the stored site map
        #[arg(long)]
        discover: bool,
    },

    /// Explore the site and write the site map
    Map {
        /// Maximum depth (default: crawler.max_depth)
        #[arg(long)]
        depth: Option<u32>,

        /// Overwrite an existing site map
        #[arg(long)]
        force: bool,
    },

    /// Process a single section or route
    Section {
        /// Route name, e.g. "about" or "academics/programmes"
        route: String,
    },

    /// Extract and save the faculty directory only
    Faculty,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Campus crawler starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let storage = LocalStorage::new(&cli.storage_dir, &config);

    match cli.command {
        Command::Crawl { depth, discover } => {
            config.validate()?;

            // Mapping first implies discovery.
            let discover = if let Some(depth) = depth {
                pipeline::run_mapper(&config, &storage, Some(depth)).await?;
                true
            } else {
                discover
            };

            let summary =
                pipeline::run_crawler(&config, &storage, &CrawlOptions { discover }).await?;
            log::info!(
                "Crawl complete: {} file(s) written to {}",
                summary.written.len(),
                storage.content_dir().display()
            );
        }

        Command::Map { depth, force } => {
            config.validate()?;

            let sitemap_path = storage.site_map_path();
            if sitemap_path.exists() && !force {
                log::warn!(
                    "Site map already exists at {}. Use --force to overwrite.",
                    sitemap_path.display()
                );
                return Ok(());
            }

            pipeline::run_mapper(&config, &storage, depth).await?;
        }

        Command::Section { route } => {
            config.validate()?;

            match pipeline::run_section(&config, &storage, &route).await? {
                Some(path) => log::info!("Saved {}", path.display()),
                None => log::warn!("No content found for route '{}'", route),
            }
        }

        Command::Faculty => {
            config.validate()?;

            let count = pipeline::run_faculty(&config, &storage).await?;
            if count == 0 {
                return Err(AppError::ExtractionEmpty("faculty directory".to_string()));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "Config OK: {} section rule(s), {} faculty rule(s), base {}",
                config.sections.len(),
                config.faculty.rules.len(),
                config.site.base_url
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
