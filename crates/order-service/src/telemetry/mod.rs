//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No plaintext payment details, addresses, or key material** in any span
//!   attribute or log field. Cipher failures are logged by error kind and
//!   order id only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::init_telemetry;
