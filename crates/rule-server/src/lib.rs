pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, patch, post};
use axum::{middleware, Router};
use rule_core::context::{SignedIn, Startup};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(startup: Startup<SignedIn>) -> Router {
    let app_state = state::AppState::new(startup);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Schema
        .route(
            "/api/schema",
            get(routes::schema::get_schema).put(routes::schema::put_schema),
        )
        .route(
            "/api/categories/{id}",
            patch(routes::schema::update_category),
        )
        .route(
            "/api/categories/{id}/habits",
            post(routes::schema::add_habit),
        )
        .route(
            "/api/categories/{id}/habits/{habit}",
            patch(routes::schema::update_habit).delete(routes::schema::remove_habit),
        )
        // Logs
        .route(
            "/api/logs",
            get(routes::logs::list_logs).post(routes::logs::create_log),
        )
        // Progress
        .route("/api/progress", get(routes::progress::get_progress))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            state::require_ready,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `port`.
pub async fn serve(startup: Startup<SignedIn>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(startup, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Accepts a `TcpListener` that was already bound so the caller can read the
/// actual port before starting (useful when `port = 0` and the OS picks a
/// free port).
pub async fn serve_on(
    startup: Startup<SignedIn>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(startup);

    tracing::info!("Rule of Life API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
