use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use appshelf_common::observability::{LogConfig, LogFormat, init_logging};
use appshelf_config::{AppshelfConfig, AppshelfConfigLoader, StoreSettings};
use appshelf_http::HttpClient;
use appshelf_store::{EntryStore, SqliteEntryStore, StoreLayout};
use appshelf_web::Scraper;
use clap::{Parser, Subcommand};

mod commands;
mod featured;

const DEFAULT_CONFIG_FILE: &str = "appshelf.yaml";

#[derive(Parser)]
#[command(
    name = "appshelf",
    about = "Discover, save and browse installable web apps",
    version
)]
struct Cli {
    /// Configuration file (defaults to ./appshelf.yaml when present)
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also log to stderr at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a page and its manifest and print the merged web app data
    Scrape { url: String },
    /// Scrape a page and save it to the shelf
    Save {
        url: String,
        /// Category tag; may be repeated
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,
    },
    /// Recently saved apps, newest first (featured apps when the shelf is empty)
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// The hand-picked featured apps
    Featured,
    /// Remove a saved app
    Remove { url: String },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppshelfConfig> {
    let loader = match path {
        Some(p) => AppshelfConfigLoader::new().with_file(p),
        None => AppshelfConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("loading configuration")
}

fn log_config(cfg: &AppshelfConfig, verbose: bool) -> Result<LogConfig> {
    let format: LogFormat = cfg.logging.format.parse().map_err(|e: String| anyhow!(e))?;
    Ok(LogConfig {
        app_name: "appshelf",
        log_dir: cfg.logging.dir.as_ref().map(PathBuf::from),
        emit_stderr: cfg.logging.emit_stderr || verbose,
        format,
        default_filter: if verbose {
            "debug".to_string()
        } else {
            cfg.logging.default_filter.clone()
        },
    })
}

fn build_scraper(cfg: &AppshelfConfig) -> Result<Scraper> {
    let http = HttpClient::build(
        &cfg.http.user_agent,
        Duration::from_secs(cfg.http.connect_timeout_secs),
    )?
    .with_timeout(Duration::from_secs(cfg.http.timeout_secs))
    .with_max_body_bytes(cfg.http.max_body_bytes);
    Ok(Scraper::new(http))
}

async fn open_store(settings: &StoreSettings) -> Result<Arc<dyn EntryStore>> {
    let layout = StoreLayout::new(
        settings.namespace.as_str(),
        settings.index_version.as_str(),
        settings.ttl_days,
    );
    let store = SqliteEntryStore::connect(&settings.database_url, layout)
        .await
        .with_context(|| format!("opening store at {}", settings.database_url))?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let cfg = load_config(cli.config.as_ref())?;
    let log_path = init_logging(log_config(&cfg, cli.verbose)?)?;
    tracing::debug!(log_path=%log_path.display(), "app.start");

    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Scrape { url } => {
            let scraper = build_scraper(&cfg)?;
            commands::scrape(&scraper, &url, &mut out).await
        }
        Command::Save { url, categories } => {
            let scraper = build_scraper(&cfg)?;
            let store = open_store(&cfg.store).await?;
            commands::save(&scraper, store.as_ref(), &url, categories, &mut out).await
        }
        Command::List { limit } => {
            let store = open_store(&cfg.store).await?;
            commands::list(store.as_ref(), limit, &mut out).await
        }
        Command::Featured => commands::featured(&mut out),
        Command::Remove { url } => {
            let store = open_store(&cfg.store).await?;
            commands::remove(store.as_ref(), &url, &mut out).await
        }
    }
}
