//! Route registration: module routes plus system endpoints and the web page.

use axum::Router;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the complete router.
///
/// Each module's routes are nested under `/{name}`; the bug module is
/// named `api`, giving `/api/bugs`.
pub fn build_router(module_routes: Vec<(String, Router)>) -> Router {
    let mut app = Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
        .route("/version", get(version));

    for (name, router) in module_routes {
        app = app.nest(&format!("/{}", name), router);
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal");
}

async fn index_page() -> impl IntoResponse {
    Html(include_str!("web/index.html"))
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "bugtrackerd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
