//! Warden admin API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;

use tracing::info;
use warden_core::AppError;

use crate::api_config::{ApiConfig, init_tracing};
use crate::api_services::{build_app_state, connect_and_migrate};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = match config.database_url.as_deref() {
        Some(database_url) if config.requires_postgres() || config.migrate_only => {
            Some(connect_and_migrate(database_url).await?)
        }
        _ => None,
    };

    if config.migrate_only {
        if pool.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required to run migrations".to_owned(),
            ));
        }
        info!("database migrations applied successfully");
        return Ok(());
    }

    let app_state = build_app_state(pool, &config)?;
    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(
        %address,
        rate_limit_backend = ?config.rate_limit_backend,
        event_log_backend = ?config.event_log_backend,
        "warden-api listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
