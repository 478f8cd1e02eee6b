//! Music Lister Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use config::{AppConfig, Backend, CliConfig, FileConfig};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use user::{InMemoryUserStore, SqliteUserStore, UserStore};
