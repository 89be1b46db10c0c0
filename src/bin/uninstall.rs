//! Uninstall binary - deletes the persisted documents and strips block
//! annotations from every post
//!
//! Usage:
//!   cargo run --bin uninstall
//!
//! Required environment variables:
//! - DATABASE_URL

use ai_content_notices::lifecycle;
use ai_content_notices::store::PgStore;
use anyhow::{Context, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ai_content_notices=info".parse()?)
                .add_directive("uninstall=info".parse()?),
        )
        .init();

    info!("Starting uninstall");

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let store = PgStore::connect(&database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let report = lifecycle::uninstall(&store, &store).await?;

    info!(
        "✓ Removed settings, styles and notice; cleaned {} of {} posts",
        report.posts_updated, report.posts_scanned
    );
    Ok(())
}
