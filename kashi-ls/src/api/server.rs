//! HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::{Pool, Sqlite};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use kashi_common::Result;

use super::{handlers, sse};
use crate::resolver::LyricsResolver;
use crate::state::ResolutionStore;
use crate::translate::TranslationResolver;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<ResolutionStore>,
    pub resolver: Arc<LyricsResolver>,
    pub translator: Arc<TranslationResolver>,
    pub db: Pool<Sqlite>,
}

/// Build the service router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route(
            "/api/lyrics",
            get(handlers::get_lyrics).post(handlers::resolve_lyrics),
        )
        .route("/api/translate", post(handlers::translate))
        .route("/api/cache/reset", post(handlers::reset_cache))
        .route(
            "/api/local",
            get(handlers::list_local).post(handlers::add_local),
        )
        .route("/api/events", get(sse::events))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Bind and serve the API
pub async fn run(bind_addr: SocketAddr, ctx: AppContext) -> Result<()> {
    let app = create_router(ctx);

    info!("Starting HTTP server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| kashi_common::Error::Internal(format!("http server: {e}")))?;

    Ok(())
}
