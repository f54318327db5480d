//! Order handling: sealing sensitive fields on write, opening them on read.
//!
//! # Invariants
//!
//! - A record handed to the store carries `payment_details` and `address`
//!   only as encrypted wire strings.
//! - Cipher failures are logged with the order id and error kind, then
//!   surfaced as [`ServiceError::EncryptionFailure`] with a generic message.
//!   Plaintext and key material are never logged.

pub mod model;
pub mod store;

pub use model::OrderRecord;
pub use store::{MemoryOrderStore, OrderRepository, ReplaceOutcome};

use std::sync::Arc;

use chrono::Utc;
use common::protocol::{CreateOrderRequest, ListOrdersQuery, OrderView, UpdateOrderRequest};
use common::ServiceError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::crypto::{CryptoError, FieldCipher};

pub const CREATE_FAILED: &str = "Error creating an order, please try again later";
pub const FETCH_FAILED: &str = "Error fetching orders, please try again later";
pub const UPDATE_FAILED: &str = "Error updating order, please try again later";

/// Read-modify-write attempts before a contended update gives up.
const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Build a stored record from a create request, encrypting both sensitive fields.
pub fn seal(cipher: &FieldCipher, req: CreateOrderRequest) -> Result<OrderRecord, CryptoError> {
    let payment_details = cipher.encrypt(&req.payment_details)?;
    let address = cipher.encrypt(&req.address)?;
    let now = Utc::now();
    Ok(OrderRecord {
        id: Uuid::new_v4(),
        user: req.user,
        items: req.items,
        payment_details,
        address,
        payment_mode: req.payment_mode,
        status: Default::default(),
        total: req.total,
        created_at: now,
        updated_at: now,
        revision: 0,
    })
}

/// Decrypt a stored record into a caller-facing view.
pub fn open(cipher: &FieldCipher, record: &OrderRecord) -> Result<OrderView, CryptoError> {
    Ok(OrderView {
        id: record.id,
        user: record.user.clone(),
        items: record.items.clone(),
        payment_details: cipher.decrypt(&record.payment_details)?,
        address: cipher.decrypt(&record.address)?,
        payment_mode: record.payment_mode,
        status: record.status,
        total: record.total,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// Apply a partial update. Supplied sensitive fields are re-encrypted under a
/// fresh IV; the record is left untouched if either encryption fails.
pub fn apply_update(
    cipher: &FieldCipher,
    record: &mut OrderRecord,
    req: &UpdateOrderRequest,
) -> Result<(), CryptoError> {
    let payment_details = req
        .payment_details
        .as_deref()
        .map(|p| cipher.encrypt(p))
        .transpose()?;
    let address = req.address.as_deref().map(|a| cipher.encrypt(a)).transpose()?;

    if let Some(p) = payment_details {
        record.payment_details = p;
    }
    if let Some(a) = address {
        record.address = a;
    }
    if let Some(items) = &req.items {
        record.items = items.clone();
    }
    if let Some(mode) = req.payment_mode {
        record.payment_mode = mode;
    }
    if let Some(status) = req.status {
        record.status = status;
    }
    if let Some(total) = req.total {
        record.total = total;
    }
    record.updated_at = Utc::now();
    Ok(())
}

/// Order operations over a store and a cipher, with HTTP-ready errors.
#[derive(Clone)]
pub struct OrderService {
    cipher: FieldCipher,
    store: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(cipher: FieldCipher, store: Arc<dyn OrderRepository>) -> Self {
        Self { cipher, store }
    }

    pub fn cipher(&self) -> &FieldCipher {
        &self.cipher
    }

    /// Number of stored orders.
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Encrypt, store, and return the new order.
    pub fn create(&self, req: CreateOrderRequest) -> Result<OrderView, ServiceError> {
        validate_total(req.total)?;
        validate_items(&req.items)?;
        if req.user.trim().is_empty() {
            return Err(ServiceError::BadRequest("user is required".into()));
        }

        let record = seal(&self.cipher, req).map_err(|e| cipher_failure(None, e, CREATE_FAILED))?;
        let view = self.view(&record, CREATE_FAILED)?;
        self.store.insert(record);
        debug!(order_id = %view.id, "order created");
        Ok(view)
    }

    /// A single order by id.
    pub fn get(&self, id: Uuid) -> Result<OrderView, ServiceError> {
        let record = self.store.get(id).ok_or_else(|| not_found(id))?;
        self.view(&record, FETCH_FAILED)
    }

    /// Every order owned by `user`.
    pub fn by_user(&self, user: &str) -> Result<Vec<OrderView>, ServiceError> {
        self.store
            .find_by_user(user)
            .iter()
            .map(|r| self.view(r, FETCH_FAILED))
            .collect()
    }

    /// A page of orders plus the unpaginated total.
    ///
    /// Pagination applies only when both `page` (1-based) and `limit` are set.
    pub fn list(&self, query: ListOrdersQuery) -> Result<(Vec<OrderView>, usize), ServiceError> {
        let (skip, limit) = match (query.page, query.limit) {
            (Some(page), Some(limit)) => {
                if page == 0 || limit == 0 {
                    return Err(ServiceError::BadRequest(
                        "page and limit must be positive".into(),
                    ));
                }
                (limit.saturating_mul(page - 1), Some(limit))
            }
            _ => (0, None),
        };

        let (records, total) = self.store.list(skip, limit);
        let views = records
            .iter()
            .map(|r| self.view(r, FETCH_FAILED))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((views, total))
    }

    /// Apply a partial update and return the updated order.
    ///
    /// The record is re-read and the update re-applied whenever another
    /// update lands between the read and the write, so concurrent updates to
    /// different fields are never lost.
    pub fn update(&self, id: Uuid, req: UpdateOrderRequest) -> Result<OrderView, ServiceError> {
        if let Some(total) = req.total {
            validate_total(total)?;
        }
        if let Some(items) = &req.items {
            validate_items(items)?;
        }

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut record = self.store.get(id).ok_or_else(|| not_found(id))?;
            apply_update(&self.cipher, &mut record, &req)
                .map_err(|e| cipher_failure(Some(id), e, UPDATE_FAILED))?;
            let view = self.view(&record, UPDATE_FAILED)?;
            match self.store.replace(record) {
                ReplaceOutcome::Replaced => {
                    debug!(order_id = %id, attempt, "order updated");
                    return Ok(view);
                }
                ReplaceOutcome::NotFound => return Err(not_found(id)),
                ReplaceOutcome::Conflict => {
                    debug!(order_id = %id, attempt, "concurrent update, retrying");
                }
            }
        }
        warn!(order_id = %id, "order update abandoned after repeated conflicts");
        Err(ServiceError::Unavailable(UPDATE_FAILED.to_owned()))
    }

    fn view(&self, record: &OrderRecord, message: &str) -> Result<OrderView, ServiceError> {
        open(&self.cipher, record).map_err(|e| cipher_failure(Some(record.id), e, message))
    }
}

fn cipher_failure(order_id: Option<Uuid>, err: CryptoError, message: &str) -> ServiceError {
    match order_id {
        Some(id) => warn!(order_id = %id, kind = err.kind(), error = %err, "order field cipher failed"),
        None => warn!(kind = err.kind(), error = %err, "order field cipher failed"),
    }
    ServiceError::EncryptionFailure(message.to_owned())
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("order {id} not found"))
}

fn validate_total(total: f64) -> Result<(), ServiceError> {
    if !total.is_finite() || total < 0.0 {
        return Err(ServiceError::BadRequest(
            "total must be a non-negative number".into(),
        ));
    }
    Ok(())
}

fn validate_items(items: &[common::protocol::OrderItem]) -> Result<(), ServiceError> {
    if items.iter().any(|i| i.quantity == 0) {
        return Err(ServiceError::BadRequest(
            "item quantity must be at least 1".into(),
        ));
    }
    Ok(())
}
