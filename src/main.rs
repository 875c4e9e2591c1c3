use std::sync::Arc;

use ancilla::{build_router, config, db, state, storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ancilla=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;

    storage::ensure_dirs(&config.exports_folder)?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    let state = Arc::new(state::AppState::new(pool, config));
    let app = build_router(state.clone());

    let addr = format!("{}:{}", state.config.host, state.config.port);
    tracing::info!("Ancilla listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
