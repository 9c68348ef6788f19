//! Server entrypoint: env, settings, pool, router, serve.

use crudkit::{app_router, AppState, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crudkit=info".parse()?))
        .init();

    // Fails here, not later: the process must not start half-configured.
    let settings = Settings::from_env()?;
    let pool = crudkit::pool(&settings)?;

    let state = AppState {
        pool,
        settings: Arc::new(settings),
    };
    let app = app_router(state)?;

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
