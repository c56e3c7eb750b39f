//! Main entry point for the contacts backend.
//!
//! This file loads configuration, sets up the database connection and
//! migrations, wires shared state and starts the Axum web server.

mod api;
mod app;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod services;
mod state;
mod utils;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use config::Config;
use database::Database;
use state::AppState;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;
    db.migrate().await?;

    let bind_address = config.bind_address();
    let state = AppState::new(db.pool().clone(), config)?;
    let app = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;

    info!("Starting contacts server on {}", bind_address);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    db.close().await;
    Ok(())
}
