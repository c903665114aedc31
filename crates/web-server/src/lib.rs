use analytics::AnalyticsEngine;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use database::DbRepository;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub db_repo: DbRepository,
    pub engine: AnalyticsEngine,
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/users/:user_id/analytics", get(handlers::get_user_analytics))
        .route(
            "/api/users/:user_id/trades",
            get(handlers::get_user_trades).post(handlers::create_trade),
        )
        .route(
            "/api/users/:user_id/trades/:trade_id",
            get(handlers::get_trade).delete(handlers::delete_trade),
        )
        .route(
            "/api/users/:user_id/challenges",
            get(handlers::get_user_challenges).post(handlers::create_challenge),
        )
        .route(
            "/api/users/:user_id/challenges/:challenge_id",
            get(handlers::get_challenge)
                .patch(handlers::update_challenge_status)
                .delete(handlers::delete_challenge),
        )
        .route("/api/analytics/preview", post(handlers::preview_analytics))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024 * 10))
}

/// Runs the web server until the process is stopped.
///
/// Tracing must already be initialized by the caller.
pub async fn run_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
