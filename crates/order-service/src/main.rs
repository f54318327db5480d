//! `order-service`: binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables, including the
//!    field encryption key.
//! 2. Initialise telemetry (JSON logs, optional OTLP export).
//! 3. Build the [`FieldCipher`](crypto::FieldCipher) and the order store.
//! 4. Build the Axum router and serve it over TLS or plain TCP.

mod config;
mod crypto;
mod orders;
mod server;
mod telemetry;

use anyhow::Result;
use tracing::info;

use config::Config;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        scheme = cfg.field_cipher_scheme.as_str(),
        tls = cfg.tls_paths().is_some(),
        "order-service starting"
    );

    // -----------------------------------------------------------------------
    // 3. Cipher and store
    // -----------------------------------------------------------------------
    let cipher = cfg.field_cipher()?;
    let state = AppState::in_memory(cipher);

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let cors = server::middleware::cors(cfg.cors_origin.as_deref())?;
    let router = server::router::build(state, cors, cfg.tls_paths().is_some());

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    match cfg.tls_paths() {
        Some((cert_path, key_path)) => {
            let tls = server::tls::load_server_config(cert_path, key_path).await?;
            info!(addr = %addr, "listening (https)");
            server::tls::serve(listener, tls, router).await?;
        }
        None => {
            info!(addr = %addr, "listening (http)");
            axum::serve(listener, router)
                .with_graceful_shutdown(server::shutdown_signal())
                .await?;
        }
    }

    Ok(())
}
