//! Router composition and shutdown wiring
//!
//! API routes are matched first; anything else is resolved against the
//! static root, which answers 404 for missing files. Hidden files and
//! directories under the root are never served.

use crate::handlers::{self, AppState};
use crate::middleware::request_id_middleware;
use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Build the complete application router
pub fn build_router(state: AppState) -> Router {
    let static_root = ServiceBuilder::new()
        .layer(middleware::from_fn(reject_hidden_paths))
        .service(ServeDir::new(&state.config().static_files.root));

    Router::new()
        .route("/", get(landing))
        .route("/api/gpt", get(handlers::recipe::handler))
        .route("/submit", post(handlers::submit::handler))
        .route("/api/dalle", get(handlers::images::dalle))
        .route("/api/fal", get(handlers::images::fal))
        .route("/api/falfast", get(handlers::images::falfast))
        .route("/health", get(handlers::health::handler))
        .route("/metrics", get(handlers::metrics::handler))
        .fallback_service(static_root)
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// GET / redirects to the landing page
async fn landing(State(state): State<AppState>) -> Response {
    (
        StatusCode::FOUND,
        [(
            header::LOCATION,
            state.config().static_files.landing_page.clone(),
        )],
    )
        .into_response()
}

/// 404 for any path with a segment starting with `.`
///
/// Keeps `.env` and other dotfiles in the static root out of reach.
async fn reject_hidden_paths(request: Request, next: Next) -> Response {
    if is_hidden_path(request.uri().path()) {
        tracing::debug!(path = %request.uri().path(), "Refusing hidden static path");
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

fn is_hidden_path(path: &str) -> bool {
    path.split('/').any(|segment| {
        // ServeDir percent-decodes, so `%2e` is a dot too
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
    })
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, draining connections");
}
