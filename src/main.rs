use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use courtside::app::build_router;
use courtside::config::AppConfig;
use courtside::db;
use courtside::services::allocator::RandomPicker;
use courtside::services::clock::SystemClock;
use courtside::services::credentials::JwtCredentials;
use courtside::services::lifecycle;
use courtside::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.jwt_secret == "changeme" {
        tracing::warn!("JWT_SECRET is not set, using the development default");
    }

    let conn = db::init_db(&config.database_url)?;
    let credentials = JwtCredentials::new(&config.jwt_secret, config.token_ttl_hours);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        clock: Box::new(SystemClock),
        picker: Box::new(RandomPicker::from_entropy()),
        credentials: Box::new(credentials),
    });

    lifecycle::spawn_sweeper(Arc::clone(&state));

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
