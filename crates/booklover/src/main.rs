use std::sync::Arc;

use migration::MigratorTrait;
use tracing_subscriber::EnvFilter;

use booklover::catalog::CatalogClient;
use booklover::config::Config;
use booklover::{db, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    let db = db::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;

    let catalog = CatalogClient::new(&config.catalog_base_url);
    let state = Arc::new(AppState {
        db,
        catalog,
        config,
    });

    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!(addr = %state.config.bind_addr, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
