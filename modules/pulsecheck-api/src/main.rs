mod routes;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feed_client::FeedClient;
use pulsecheck_common::Config;
use pulsecheck_store::{migrate, SummaryStore, WorkQueue};

pub struct AppState {
    pub store: SummaryStore,
    pub queue: WorkQueue,
    pub feed: FeedClient,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulsecheck=info")),
        )
        .init();

    info!("PulseCheck API starting...");

    let config = Config::api_from_env();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await?;
    migrate(&pool).await?;
    info!("Connected to database, schema ready");

    let state = Arc::new(AppState {
        store: SummaryStore::new(pool.clone()),
        queue: WorkQueue::new(pool),
        feed: FeedClient::new(&config.feed_token),
    });

    let app = routes::router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!(addr = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
