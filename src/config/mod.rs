mod file_config;

pub use file_config::FileConfig;

use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    #[default]
    Memory,
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Memory => write!(f, "memory"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub backend: Backend,
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        CliConfig {
            backend: Backend::default(),
            db_path: None,
            port: server.port,
            bind_address: server.bind_address,
            logging_level: server.requests_logging_level,
            frontend_dir_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: Backend,
    /// Set only for the sqlite backend.
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let backend = match file.backend {
            Some(name) => Backend::from_str(&name, true)
                .map_err(|_| anyhow!("Unknown backend in config file: {}", name))?,
            None => cli.backend,
        };

        let db_path = match backend {
            Backend::Memory => None,
            Backend::Sqlite => {
                let db_path = file
                    .db_path
                    .map(PathBuf::from)
                    .or_else(|| cli.db_path.clone())
                    .ok_or_else(|| {
                        anyhow!("db_path must be specified via --db-path or in config file")
                    })?;
                validate_db_path(&db_path)?;
                Some(db_path)
            }
        };

        let port = file.port.unwrap_or(cli.port);
        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());

        let logging_level = match file.logging_level {
            Some(level) => parse_logging_level(&level)
                .ok_or_else(|| anyhow!("Unknown logging level in config file: {}", level))?,
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        Ok(Self {
            backend,
            db_path,
            port,
            bind_address,
            logging_level,
            frontend_dir_path,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            bind_address: self.bind_address.clone(),
            port: self.port,
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

fn validate_db_path(db_path: &Path) -> Result<()> {
    if db_path.is_dir() {
        bail!("db_path is a directory: {:?}", db_path);
    }
    let parent = match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(()),
    };
    if !parent.is_dir() {
        bail!("Database directory does not exist: {:?}", parent);
    }
    Ok(())
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sqlite_cli(db_path: PathBuf) -> CliConfig {
        CliConfig {
            backend: Backend::Sqlite,
            db_path: Some(db_path),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert_eq!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        );
        assert_eq!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        );
        assert_eq!(
            parse_logging_level("BODY"),
            Some(RequestsLoggingLevel::Body)
        );
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let config = AppConfig::resolve(&CliConfig::default(), None).unwrap();

        assert_eq!(config.backend, Backend::Memory);
        assert!(config.db_path.is_none());
        assert_eq!(config.port, 9090);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.logging_level, RequestsLoggingLevel::Path);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("music.db");
        let file = FileConfig {
            backend: Some("sqlite".to_owned()),
            db_path: Some(db_path.to_string_lossy().into_owned()),
            port: Some(4000),
            logging_level: Some("headers".to_owned()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&CliConfig::default(), Some(file)).unwrap();

        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.db_path, Some(db_path));
        assert_eq!(config.port, 4000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);

        let server_config = config.server_config();
        assert_eq!(server_config.port, 4000);
        assert_eq!(
            server_config.requests_logging_level,
            RequestsLoggingLevel::Headers
        );
    }

    #[test]
    fn test_resolve_sqlite_without_db_path_error() {
        let cli = CliConfig {
            backend: Backend::Sqlite,
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_resolve_sqlite_missing_parent_dir_error() {
        let temp_dir = TempDir::new().unwrap();
        let cli = sqlite_cli(temp_dir.path().join("missing").join("music.db"));
        assert!(AppConfig::resolve(&cli, None).is_err());

        let cli = sqlite_cli(temp_dir.path().to_path_buf());
        assert!(AppConfig::resolve(&cli, None).is_err());

        let cli = sqlite_cli(temp_dir.path().join("music.db"));
        assert!(AppConfig::resolve(&cli, None).is_ok());
    }

    #[test]
    fn test_resolve_rejects_unknown_file_values() {
        let file = FileConfig {
            backend: Some("postgres".to_owned()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&CliConfig::default(), Some(file)).is_err());

        let file = FileConfig {
            logging_level: Some("loud".to_owned()),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&CliConfig::default(), Some(file)).is_err());
    }

    #[test]
    fn test_memory_backend_ignores_db_path() {
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/nonexistent/dir/music.db")),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(config.db_path.is_none());
    }
}
