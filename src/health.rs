//! Keep-alive HTTP endpoint for hosts that probe the process over HTTP.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::info;

const ALIVE: &str = "Bot is running!";

fn router() -> Router {
    Router::new().route("/", get(home))
}

async fn home() -> &'static str {
    ALIVE
}

/// Bind `0.0.0.0:{port}` and serve until the process exits.
pub async fn serve(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind health endpoint on {}", addr))?;
    serve_on(listener).await
}

async fn serve_on(listener: TcpListener) -> Result<()> {
    info!("Health endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, router())
        .await
        .context("Health endpoint stopped")
}
