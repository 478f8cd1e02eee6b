use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use music_lister_server::server::state::GuardedUserStore;
use music_lister_server::{
    run_server, AppConfig, Backend, CliConfig, FileConfig, InMemoryUserStore, RequestsLoggingLevel,
    SqliteUserStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let resolved_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if resolved_path.is_absolute() {
        return Ok(resolved_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(resolved_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Storage backend for users, playlists and songs.
    #[clap(long, value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,

    /// Path to the SQLite database file, required by the sqlite backend.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 9090)]
    pub port: u16,

    /// The address to bind to.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Path to a TOML config file. Values found there override the flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            backend: self.backend,
            db_path: self.db_path.clone(),
            port: self.port,
            bind_address: self.bind_address.clone(),
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

fn open_user_store(config: &AppConfig) -> Result<GuardedUserStore> {
    match (&config.backend, &config.db_path) {
        (Backend::Sqlite, Some(db_path)) => {
            info!("Opening SQLite user database at {:?}...", db_path);
            let store = SqliteUserStore::new(db_path)
                .with_context(|| format!("Failed to open user database {:?}", db_path))?;
            Ok(Arc::new(store))
        }
        (Backend::Sqlite, None) => anyhow::bail!("The sqlite backend needs a database path"),
        (Backend::Memory, _) => {
            info!("Using in-memory user store, data is lost on exit");
            Ok(Arc::new(InMemoryUserStore::default()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let user_store = open_user_store(&app_config)?;
    info!(
        "Starting music lister server with {} backend on {}:{}",
        app_config.backend, app_config.bind_address, app_config.port
    );

    run_server(app_config.server_config(), user_store).await
}
