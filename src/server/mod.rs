//! HTTP/WebSocket server exposing the coordinator
//!
//! `POST /api/query` runs a turn, `POST /api/route` previews the routing
//! decision, and `/ws/events` streams routing and interaction events.

mod events;
pub mod routes;
pub mod state;

pub use events::{EventBroadcaster, ServerEvent};
pub use state::ServerAppState;

use anyhow::{Context, Result};
use axum::{
    http::header::{ACCEPT, CONTENT_TYPE},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;

/// Build the application router over shared state
pub fn build_router(state: ServerAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    Router::new()
        .route("/ws/events", get(events::ws_handler))
        .route("/health", get(routes::health_handler))
        .route("/api/version", get(routes::version_handler))
        .route("/api/agents", get(routes::agents_handler))
        .route("/api/route", post(routes::route_handler))
        .route("/api/query", post(routes::query_handler))
        .route("/api/turns/:turn_id", get(routes::turn_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve until the shutdown flag is raised
pub async fn run_server(config: &ServerConfig, state: ServerAppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("Invalid address: {}:{}", config.bind, config.port))?;

    let shutdown_state = state.shutdown_state.clone();
    let agent_count = state.coordinator.router().registry().len();
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\nIdeaForge coordinator listening on http://{}", addr);
    println!("  {} agent(s) registered", agent_count);
    println!("  POST /api/query      - Run a query turn");
    println!("  POST /api/route      - Preview routing");
    println!("  GET  /api/agents     - Registered agents");
    println!("  GET  /api/turns/:id  - Recorded turn");
    println!("  GET  /ws/events      - WebSocket events\n");

    log::info!("Server listening on http://{}", addr);

    let shutdown_signal = async move {
        shutdown_state.wait().await;
        log::info!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")
}
