use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use quire::api::{BlogClient, BlogQueries};
use quire::app::{App, AppEvent};
use quire::config::{Config, API_URL_ENV};
use quire::storage::{Database, DatabaseError, KeyValueStore, MemoryStore};
use quire::util::parse_http_url;

/// Environment variable naming a file to receive logs.
const LOG_FILE_ENV: &str = "QUIRE_LOG_FILE";

/// Get the config directory path (~/.config/quire/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("quire"))
}

#[derive(Parser, Debug)]
#[command(name = "quire", about = "Terminal client for browsing and writing blog posts")]
struct Args {
    /// Blog service base URL (overrides QUIRE_API_URL and the config file)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Config file to read instead of ~/.config/quire/config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Delete saved UI state (selection, theme) before starting
    #[arg(long)]
    reset_state: bool,
}

/// Logs go to stderr, or to `QUIRE_LOG_FILE` so they stay out of the TUI.
fn init_tracing() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    match std::env::var_os(LOG_FILE_ENV) {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", Path::new(&path).display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

/// Create the config directory if needed, restricted to the owner on unix.
fn prepare_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }
    Ok(())
}

/// Open the state database, falling back to memory when it is unusable.
async fn open_store(db_path: &Path) -> Result<Arc<dyn KeyValueStore>> {
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in state database path"))?;

    match Database::open(db_path_str).await {
        Ok(db) => Ok(Arc::new(db)),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of quire appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            tracing::warn!(
                path = %db_path.display(),
                error = %e,
                "State database unavailable, selection and theme will not persist"
            );
            eprintln!("Warning: {e}. Continuing without saved state.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    prepare_config_dir(&config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_api_url_override(args.api_url.as_deref(), std::env::var(API_URL_ENV).ok());

    let base = parse_http_url(&config.api_url)
        .with_context(|| format!("Invalid blog service URL '{}'", config.api_url))?;
    tracing::info!(api_url = %base, "Using blog service");

    let db_path = config_dir.join("state.db");
    if args.reset_state && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete state database")?;
        println!("Saved state reset.");
    }
    let store = open_store(&db_path).await?;

    let client = BlogClient::new(&config.api_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let queries = BlogQueries::new(client, config.stale_after(), config.cache_capacity);

    let mut app = App::new(queries, store, &config);
    app.restore_state().await;

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    quire::ui::run(&mut app, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
