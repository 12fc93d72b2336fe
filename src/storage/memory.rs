// src/storage/memory.rs
use parking_lot::RwLock;
use std::sync::Arc;
use crate::models::status::StatusRecord;

/// Holds the most recent status record. Each `set` replaces the slot whole.
#[derive(Debug, Default)]
pub struct StatusCache {
    latest: RwLock<Option<Arc<StatusRecord>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<Arc<StatusRecord>> {
        self.latest.read().clone()
    }

    pub fn set(&self, record: StatusRecord) -> Arc<StatusRecord> {
        let record = Arc::new(record);
        *self.latest.write() = Some(record.clone());
        record
    }
}
