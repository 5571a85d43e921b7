use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::{Level, info};

use adapter::{LegacySource, PipelineOptions};
use server::config::AppConfig;
use server::database::init_db;
use server::services::legacy_source::HttpLegacySource;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;
    let db = init_db(&config.database.url).await?;

    let legacy: Arc<dyn LegacySource> = Arc::new(HttpLegacySource::new(
        config.legacy.api_url.clone(),
        config.legacy.page_size,
    ));
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        config,
        db,
        legacy,
        options: Arc::new(PipelineOptions::default()),
        migration_stop: Arc::new(AtomicBool::new(false)),
    };
    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
