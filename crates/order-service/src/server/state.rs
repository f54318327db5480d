//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::crypto::FieldCipher;
use crate::orders::{MemoryOrderStore, OrderRepository, OrderService};

/// Application state shared across all request handlers.
///
/// Cheap to clone: the cipher key and the store are `Arc`-backed.
#[derive(Clone)]
pub struct AppState {
    /// Order operations with field encryption wired in.
    pub orders: OrderService,
}

impl AppState {
    /// Create a new [`AppState`] from a cipher and an order store.
    pub fn new(cipher: FieldCipher, store: Arc<dyn OrderRepository>) -> Self {
        Self {
            orders: OrderService::new(cipher, store),
        }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(cipher: FieldCipher) -> Self {
        Self::new(cipher, Arc::new(MemoryOrderStore::new()))
    }
}

#[cfg(test)]
impl Default for AppState {
    /// In-memory state with a fixed key, suitable for tests.
    fn default() -> Self {
        use crate::crypto::{FieldKey, Scheme, KEY_LEN};
        let key = FieldKey::from_bytes(&[0x42; KEY_LEN]).expect("fixed test key");
        Self::in_memory(FieldCipher::new(key, Scheme::Aead))
    }
}
