mod api;
mod config;
mod db;
mod errors;
mod models;
mod prover;
mod state;

use crate::config::Settings;
use crate::errors::ApiError;
use crate::state::AppState;
use tracing_subscriber::EnvFilter;
use zk_aggregate::constants::FORECAST_WINDOW;
use zk_aggregate::forecast::VolatilityForecaster;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::from_env()?;

    // Store local state under backend/data (ignored by git).
    std::fs::create_dir_all(&settings.data_dir).map_err(|_| ApiError::Internal)?;

    let db_path = settings.data_dir.join("ledger.sqlite");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.to_string_lossy());

    let db = db::connect(&db_url).await?;
    db::init_schema(&db).await?;

    let history = db::recent_volatility_std(&db, FORECAST_WINDOW as u64).await?;
    tracing::info!(observations = history.len(), "restored volatility history");
    let forecaster = VolatilityForecaster::from_history(history);

    let addr = settings.addr.clone();
    let state = AppState::new(db, settings, forecaster);

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|_| ApiError::Internal)?;

    tracing::info!(%addr, "prover backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .map_err(|_| ApiError::Internal)?;

    Ok(())
}
