//! Axum HTTP(S) server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all order routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Serve over plain TCP, or terminate TLS with rustls when configured.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tls;

use tracing::{info, warn};

/// Resolves when the process receives Ctrl-C (SIGINT).
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
