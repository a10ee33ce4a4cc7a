//! labgraph-api: REST API over the research-lab knowledge graph.
//!
//! Axum router, per-type entity handlers, the mutation service and
//! configuration. The `labgraph` binary wraps this crate with a CLI.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        // Schemes
        .route("/scheme", get(routes::list_schemes))
        .route("/scheme/{entity_type}", get(routes::get_scheme))
        // Entities
        .route(
            "/entity/{entity_type}",
            get(routes::get_all).post(routes::create_entity),
        )
        .route(
            "/entity/{entity_type}/{id}",
            get(routes::get_by_id).post(routes::mutate_entity),
        )
        .route("/search/{entity_type}", get(routes::search))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the web server until Ctrl-C.
pub async fn run_server(state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "LabGraph API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
