//! Configuration management for the Delivery Hub server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with DHUB_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Public storefront configuration
    pub storefront: StorefrontConfig,

    /// Receipt printing configuration
    pub printing: PrintingConfig,

    /// Realtime change feed configuration
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the public storefront, used in tracking links
    pub public_base_url: String,

    /// Key for signing order tracking tokens
    pub tracking_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrintingConfig {
    /// Local-network print server endpoint
    pub print_server_url: String,

    /// Bearer token for the print server, empty when not required
    pub print_server_token: String,

    /// URL scheme handled by the thermal printer bridge app
    pub bridge_scheme: String,

    /// Characters per line of text receipts
    pub paper_width: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeConfig {
    /// Events buffered per subscriber before lagging ones drop messages
    pub channel_capacity: usize,

    /// Interval of SSE keep-alive comments
    pub keep_alive_seconds: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("DHUB_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("storefront.public_base_url", "http://localhost:5173")?
            .set_default("printing.print_server_url", "http://localhost:8089")?
            .set_default("printing.print_server_token", "")?
            .set_default("printing.bridge_scheme", "dhubprint")?
            .set_default("printing.paper_width", 48)?
            .set_default("realtime.channel_capacity", 256)?
            .set_default("realtime.keep_alive_seconds", 15)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (DHUB_ prefix)
            .add_source(
                Environment::with_prefix("DHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
