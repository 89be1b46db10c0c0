use ai_content_notices::config::Config;
use ai_content_notices::defaults::ConfigStore;
use ai_content_notices::lifecycle;
use ai_content_notices::server::{self, AppState};
use ai_content_notices::store::{DocumentStore, MemoryStore, PgStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ai_content_notices=info".parse()?),
        )
        .init();

    info!("Starting AI content notices service");

    // Load configuration from environment
    let config = Config::from_env()?;

    let defaults = match &config.defaults_path {
        Some(path) => ConfigStore::from_path(path)
            .with_context(|| format!("Failed to load defaults from {}", path.display()))?,
        None => ConfigStore::embedded().context("Embedded defaults are invalid")?,
    };

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?,
        ),
        None => {
            warn!("DATABASE_URL not set, settings are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    // Seed missing documents; a failure here stops the process
    lifecycle::activate(store.as_ref(), &defaults)
        .await
        .context("Activation failed")?;

    let port = config.port;
    let state = AppState::new(store, defaults, config);
    server::serve(state, port).await
}
