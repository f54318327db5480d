//! Stored order records.

use chrono::{DateTime, Utc};
use common::protocol::{OrderItem, OrderStatus, PaymentMode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An order as persisted in the order store.
///
/// `payment_details` and `address` hold encrypted wire strings, never
/// plaintext. Use [`super::open`] to obtain a caller-facing view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: Uuid,
    pub user: String,
    pub items: Vec<OrderItem>,
    pub payment_details: String,
    pub address: String,
    pub payment_mode: PaymentMode,
    pub status: OrderStatus,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every successful replace.
    #[serde(default)]
    pub revision: u64,
}
