//! REST API for Vest.
//!
//! [`app`] builds the router with its middleware; [`serve`] binds it and runs
//! until Ctrl+C or SIGTERM. Handlers live under [`routes`], grouped by
//! audience: public, investor (`/api/...`) and back office (`/api/admin/...`).

pub mod credentials;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, StartupError};
pub use state::AppState;

/// Room for text fields and multipart framing on top of the file payloads.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Files accepted by the largest form (KYC: document and selfie).
const MAX_FILES_PER_REQUEST: usize = 2;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let server = &state.config().server;
    let body_limit = server
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(FORM_OVERHEAD_BYTES);
    let cors = cors_layer(&server.cors_origins);

    let app = routes::router()
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http());
    let app = match cors {
        Some(cors) => app.layer(cors),
        None => app,
    };
    app.with_state(state)
}

/// `None` when no origins are configured, so browsers fall back to same-origin.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::PATCH])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
    )
}

/// Bind `addr` and serve until a shutdown signal arrives.
///
/// # Errors
///
/// Returns `StartupError::Io` if the listener cannot bind or the server fails.
pub async fn serve(state: AppState, addr: &str) -> Result<(), StartupError> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Vest API listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
