//! Request and response types exchanged over the public HTTP API.
//!
//! Field names are camelCase on the wire. `paymentDetails` and `address` are
//! always plaintext in these types; their encrypted form exists only inside
//! the service's order store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product identifier.
    pub product: String,
    /// Number of units ordered.
    pub quantity: u32,
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMode {
    /// Cash on delivery.
    #[default]
    Cod,
    Upi,
    Card,
}

/// Fulfilment state of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Dispatched,
    #[serde(rename = "Out for delivery")]
    OutForDelivery,
    Cancelled,
    Delivered,
}

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Owning user id.
    pub user: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Sensitive; encrypted before storage.
    pub payment_details: String,
    /// Sensitive; encrypted before storage.
    pub address: String,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    pub total: f64,
}

/// Request body for `PATCH /orders/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub items: Option<Vec<OrderItem>>,
    pub payment_details: Option<String>,
    pub address: Option<String>,
    pub payment_mode: Option<PaymentMode>,
    pub status: Option<OrderStatus>,
    pub total: Option<f64>,
}

/// An order as returned to callers, with sensitive fields decrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
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
}

/// Query string for `GET /orders`.
///
/// Pagination applies only when both `page` (1-based) and `limit` are present.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.message())
    }
}

// ---------------------------------------------------------------------------
// Health check and root
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status: `"ok"`.
    pub status: String,
    /// Cipher scheme used for new writes (`"aead"` or `"cbc"`).
    pub scheme: String,
    /// Number of orders currently stored.
    pub orders_stored: usize,
}

/// Response body for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
