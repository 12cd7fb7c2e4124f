//! HTTP API over the quote store
//!
//! | Method | Path          | Success                    | Failure |
//! |--------|---------------|----------------------------|---------|
//! | GET    | /quotes       | 200, array of quotes       |         |
//! | POST   | /quotes       | 200, created quote with id |         |
//! | GET    | /quotes/{id}  | 200, quote                 | 404     |
//! | PUT    | /quotes/{id}  | 200, updated quote         | 404     |
//! | DELETE | /quotes/{id}  | 200, `{"message"}`         | 404     |
//! | GET    | /health       | 200                        | 503     |

mod error;
mod routes;

pub use error::ApiError;
pub use routes::DeleteResponse;

use crate::config::ServerConfig;
use crate::storage::QuoteStore;
use crate::QuotebookError;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QuoteStore>,
}

/// Builds the API router
pub fn build_router(store: Arc<dyn QuoteStore>, request_timeout: Duration) -> Router {
    let state = AppState { store };

    Router::new()
        .route(
            "/quotes",
            get(routes::list_quotes).post(routes::create_quote),
        )
        .route(
            "/quotes/:id",
            get(routes::get_quote)
                .put(routes::update_quote)
                .delete(routes::delete_quote),
        )
        .route("/health", get(routes::health))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until Ctrl-C
pub async fn serve(config: &ServerConfig, store: Arc<dyn QuoteStore>) -> Result<(), QuotebookError> {
    let app = build_router(store, Duration::from_secs(config.request_timeout_secs));

    let listener = tokio::net::TcpListener::bind(config.bind.as_str()).await?;
    tracing::info!("Quotes API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Quotes API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
