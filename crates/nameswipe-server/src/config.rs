//! Server configuration
//!
//! | Variable                        | Default                             |
//! |---------------------------------|-------------------------------------|
//! | `NAMESWIPE_HOST`                | `127.0.0.1`                         |
//! | `NAMESWIPE_PORT`                | `8000`                              |
//! | `NAMESWIPE_SHUTDOWN_TIMEOUT`    | `10` (seconds)                      |
//! | `DATABASE_URL`                  | `postgresql://localhost/nameswipe`  |
//! | `DATABASE_MAX_CONNECTIONS`      | `10`                                |
//! | `DATABASE_MIN_CONNECTIONS`      | `1`                                 |
//! | `DATABASE_ACQUIRE_TIMEOUT`      | `10` (seconds)                      |
//! | `DATABASE_IDLE_TIMEOUT`         | `600` (seconds)                     |
//! | `CORS_ALLOWED_ORIGINS`          | `http://localhost:3000`             |
//! | `CORS_ALLOW_CREDENTIALS`        | `false`                             |
//!
//! Ingestion settings (`INGEST_*`) are read by
//! [`IngestConfig::from_env`](nameswipe_ingest::IngestConfig::from_env).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use nameswipe_common::env::{list_or, secs_or, var_or};
use nameswipe_ingest::IngestConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/nameswipe";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long open connections (event streams included) may hold up shutdown
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

/// Connection pool settings for the name catalog
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Empty or `*` allows any origin
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Config {
    /// Read the environment, then validate
    pub fn load() -> anyhow::Result<Self> {
        let config = Config {
            server: ServerConfig {
                host: var_or("NAMESWIPE_HOST", DEFAULT_HOST.to_string())?,
                port: var_or("NAMESWIPE_PORT", DEFAULT_PORT)?,
                shutdown_timeout: secs_or(
                    "NAMESWIPE_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                )?,
            },
            database: DatabaseConfig {
                url: var_or("DATABASE_URL", DEFAULT_DATABASE_URL.to_string())?,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
                min_connections: var_or("DATABASE_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS)?,
                acquire_timeout: secs_or("DATABASE_ACQUIRE_TIMEOUT", DEFAULT_ACQUIRE_TIMEOUT_SECS)?,
                idle_timeout: secs_or("DATABASE_IDLE_TIMEOUT", DEFAULT_IDLE_TIMEOUT_SECS)?,
            },
            cors: CorsConfig {
                allowed_origins: list_or("CORS_ALLOWED_ORIGINS", &[DEFAULT_CORS_ORIGIN]),
                allow_credentials: var_or("CORS_ALLOW_CREDENTIALS", false)?,
            },
            ingest: IngestConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.server.bind_addr()?;

        if self.database.url.trim().is_empty() {
            bail!("DATABASE_URL cannot be empty");
        }
        if self.database.max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be greater than 0");
        }
        if self.database.min_connections > self.database.max_connections {
            bail!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        self.ingest.validate()?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_MAX_CONNECTIONS,
                min_connections: DEFAULT_MIN_CONNECTIONS,
                acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
                idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
                allow_credentials: false,
            },
            ingest: IngestConfig::default(),
        }
    }
}
