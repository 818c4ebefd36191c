use rusqlite::Connection;
use std::path::PathBuf;
use anyhow::{Context, Result};
use crate::db::migrations::MigrationManager;

/// Database connection manager
pub struct DbConnection;

impl DbConnection {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        Self::home_dir().join(".charla").join("charla.db")
    }

    /// Get database path from configuration file or default
    pub fn resolve_path() -> Result<PathBuf> {
        let config_path = Self::config_path();

        if config_path.exists() {
            if let Ok(config) = std::fs::read_to_string(&config_path) {
                for line in config.lines() {
                    let line = line.trim();
                    if let Some(path_str) = line.strip_prefix("data.location=") {
                        let path = PathBuf::from(path_str.trim());

                        // If path is relative, resolve relative to config file directory
                        if path.is_relative() {
                            if let Some(parent) = config_path.parent() {
                                return Ok(parent.join(path));
                            }
                        }
                        return Ok(path);
                    }
                }
            }
        }

        Ok(Self::default_path())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::home_dir().join(".charla").join("rc")
    }

    fn home_dir() -> PathBuf {
        dirs::home_dir()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .expect("home directory not found")
    }

    /// Connect to the database, creating it and parent directories if needed
    pub fn connect() -> Result<Connection> {
        let db_path = Self::resolve_path()?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        // Must be set outside a transaction to take effect
        conn.execute_batch("PRAGMA foreign_keys=ON")?;

        // Initialize schema
        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }

    /// Connect to an in-memory database (for testing)
    pub fn connect_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;

        conn.execute_batch("PRAGMA foreign_keys=ON")?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }
}
