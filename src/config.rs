use anyhow::{bail, Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Admin
    pub admin_api_key: String,
    pub nonce_ttl_hours: i64,

    // Server
    pub port: u16,

    // Storage
    pub database_url: Option<String>,
    pub defaults_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            // Admin - Bearer token for the /admin routes
            admin_api_key: std::env::var("ADMIN_API_KEY").context("ADMIN_API_KEY not set")?,
            nonce_ttl_hours: std::env::var("NONCE_TTL_HOURS")
                .ok()
                .map(|v| v.parse().context("NONCE_TTL_HOURS must be a whole number"))
                .transpose()?
                .unwrap_or(24),

            // Server
            port: std::env::var("PORT")
                .ok()
                .map(|v| v.parse().context("PORT must be a valid port number"))
                .transpose()?
                .unwrap_or(8080),

            // Storage - in-memory when DATABASE_URL is unset
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            defaults_path: std::env::var("DEFAULTS_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.admin_api_key.trim().is_empty() {
            bail!("ADMIN_API_KEY must not be empty");
        }
        if self.nonce_ttl_hours <= 0 {
            bail!("NONCE_TTL_HOURS must be positive");
        }
        Ok(())
    }
}
