//! Field-level encryption for the sensitive order fields.
//!
//! This module is free of HTTP and storage dependencies. Callers construct a
//! [`FieldCipher`] once at startup from validated key material and pass it
//! explicitly to whatever needs it.
//!
//! # Invariants
//!
//! - Every encryption draws a fresh IV/nonce from the OS CSPRNG.
//! - Key material never appears in logs or `Debug` output.

pub mod cipher;
pub mod key;

pub use cipher::{CryptoError, FieldCipher, Scheme, KEY_LEN};
pub use key::FieldKey;
