//! The order store seam and its in-memory implementation.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::model::OrderRecord;

/// Persistence operations the order service needs.
///
/// Implementations return records in creation order. No method is async and
/// none may block on I/O for long; the in-memory store satisfies both.
#[cfg_attr(test, mockall::automock)]
pub trait OrderRepository: Send + Sync {
    /// Append a new record.
    fn insert(&self, record: OrderRecord);

    /// Look up a record by id.
    fn get(&self, id: Uuid) -> Option<OrderRecord>;

    /// All records owned by `user`.
    fn find_by_user(&self, user: &str) -> Vec<OrderRecord>;

    /// Records after skipping `skip`, at most `limit` of them (`None` = all),
    /// together with the total record count taken from the same snapshot.
    fn list(&self, skip: usize, limit: Option<usize>) -> (Vec<OrderRecord>, usize);

    /// Total number of stored records.
    fn count(&self) -> usize;

    /// Replace the record with the same id, provided its stored revision still
    /// equals `record.revision`. On success the stored revision is bumped.
    fn replace(&self, record: OrderRecord) -> ReplaceOutcome;
}

/// Result of [`OrderRepository::replace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced,
    /// The record changed since it was read.
    Conflict,
    NotFound,
}

/// Thread-safe in-memory order store.
///
/// Backed by an `Arc<RwLock<Vec<_>>>`; clones share the same records. The
/// lock is synchronous and never held across an `.await`.
#[derive(Clone, Debug, Default)]
pub struct MemoryOrderStore {
    records: Arc<RwLock<Vec<OrderRecord>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRepository for MemoryOrderStore {
    fn insert(&self, record: OrderRecord) {
        self.records.write().push(record);
    }

    fn get(&self, id: Uuid) -> Option<OrderRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    fn find_by_user(&self, user: &str) -> Vec<OrderRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.user == user)
            .cloned()
            .collect()
    }

    fn list(&self, skip: usize, limit: Option<usize>) -> (Vec<OrderRecord>, usize) {
        let records = self.records.read();
        let page = records.iter().skip(skip);
        let page: Vec<OrderRecord> = match limit {
            Some(n) => page.take(n).cloned().collect(),
            None => page.cloned().collect(),
        };
        (page, records.len())
    }

    fn count(&self) -> usize {
        self.records.read().len()
    }

    fn replace(&self, mut record: OrderRecord) -> ReplaceOutcome {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) if slot.revision != record.revision => ReplaceOutcome::Conflict,
            Some(slot) => {
                record.revision = slot.revision.wrapping_add(1);
                *slot = record;
                ReplaceOutcome::Replaced
            }
            None => ReplaceOutcome::NotFound,
        }
    }
}
