//! Configuration module for the catalog service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Credential of the bootstrap privileged actor
    pub admin_key: Option<String>,
    /// Display label of the bootstrap privileged actor; must not belong to another actor
    pub admin_label: String,
    /// JSON array of catalog records imported into an empty catalog
    pub seed_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("WT_DB_PATH")
            .unwrap_or_else(|_| "./data/catalog.sqlite".to_string())
            .into();

        let bind_addr = env::var("WT_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()?;

        let log_level = env::var("WT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admin_key = env::var("WT_ADMIN_KEY").ok().filter(|k| !k.is_empty());
        let admin_label = env::var("WT_ADMIN_LABEL").unwrap_or_else(|_| "admin".to_string());

        let seed_file = env::var("WT_SEED_FILE").ok().map(PathBuf::from);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            admin_key,
            admin_label,
            seed_file,
        })
    }
}
