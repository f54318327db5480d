//! Configuration loading and validation for the order service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::{FieldCipher, Scheme};

/// Validated order service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Field encryption key: 32 raw bytes or 64 hex characters. **Required.**
    pub encryption_key: String,

    /// Scheme used to encrypt newly written fields (`aead` or `cbc`).
    ///
    /// Defaults to `aead`, which writes `nonce:ciphertext:tag`. Only `cbc`
    /// writes the two-segment `iv:ciphertext` values that the earlier
    /// deployment stores and can read back; choose it while that deployment
    /// still shares the data. Both shapes are always readable here.
    #[serde(default)]
    pub field_cipher_scheme: Scheme,

    /// Port the HTTP(S) server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// PEM certificate chain. TLS is enabled when this and `tls_key_path` are set.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key matching `tls_cert_path`.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// Browser origin allowed by CORS. No cross-origin access when unset.
    #[serde(default)]
    pub cors_origin: Option<String>,

    /// OTLP gRPC endpoint. Span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8443
}
fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_key", &"[REDACTED]")
            .field("field_cipher_scheme", &self.field_cipher_scheme)
            .field("listen_port", &self.listen_port)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("cors_origin", &self.cors_origin)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Build the field cipher from the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if `ENCRYPTION_KEY` is not 32 bytes.
    pub fn field_cipher(&self) -> Result<FieldCipher> {
        FieldCipher::from_key_material(&self.encryption_key, self.field_cipher_scheme)
            .context("ENCRYPTION_KEY is invalid")
    }

    /// TLS certificate and key paths, when TLS is enabled.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        self.field_cipher()?;

        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => {
                ensure_non_empty(cert, "TLS_CERT_PATH")?;
                ensure_non_empty(key, "TLS_KEY_PATH")?;
            }
            (None, None) => {}
            _ => anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together"),
        }

        if let Some(origin) = &self.cors_origin {
            ensure_non_empty(origin, "CORS_ORIGIN")?;
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty when set");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            encryption_key: "0123456789abcdefghijklmnopqrstuv".into(),
            field_cipher_scheme: Scheme::default(),
            listen_port: default_listen_port(),
            tls_cert_path: None,
            tls_key_path: None,
            cors_origin: None,
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 8443);
        assert_eq!(default_log_level(), "info");
        assert_eq!(Scheme::default(), Scheme::Aead);
    }

    #[test]
    fn cbc_scheme_writes_two_segment_values() {
        let cfg = Config {
            field_cipher_scheme: Scheme::Cbc,
            ..base()
        };
        let wire = cfg.field_cipher().unwrap().encrypt("123 Main St").unwrap();
        let (iv, ct) = wire.split_once(':').unwrap();
        assert_eq!(iv.len(), 32);
        assert!(!ct.is_empty() && !ct.contains(':'));
        assert!(wire
            .chars()
            .all(|c| c == ':' || c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn default_scheme_writes_three_segment_values() {
        let wire = base().field_cipher().unwrap().encrypt("123 Main St").unwrap();
        assert_eq!(wire.split(':').count(), 3);
    }

    #[test]
    fn validate_accepts_minimal_config() {
        assert!(base().validate().is_ok());
        assert!(base().tls_paths().is_none());
    }

    #[test]
    fn validate_rejects_short_key() {
        let cfg = Config {
            encryption_key: "not-32-bytes".into(),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_key() {
        let cfg = Config {
            encryption_key: String::new(),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_half_tls_config() {
        let cfg = Config {
            tls_cert_path: Some("/etc/tls/server.cert".into()),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tls_paths_when_both_set() {
        let cfg = Config {
            tls_cert_path: Some("server.cert".into()),
            tls_key_path: Some("server.key".into()),
            ..base()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.tls_paths(), Some(("server.cert", "server.key")));
    }

    #[test]
    fn debug_redacts_key() {
        let printed = format!("{:?}", base());
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("0123456789abcdef"));
    }
}
