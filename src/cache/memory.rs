//! Process-local cache gateway

use super::{CacheGateway, CacheResult};
use crate::error::CacheError;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cache gateway backed by a `HashMap`
///
/// Every delete request is logged, whether or not it succeeds, so callers
/// can check which keys a write targeted.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    deleted: Mutex<Vec<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key is currently cached
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drain the log of keys targeted for deletion
    pub fn take_deleted(&self) -> Vec<String> {
        std::mem::take(&mut *self.deleted.lock())
    }

    /// Make `get` fail with a connection error
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `set` fail with a connection error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `delete` fail with a connection error
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite a key directly, bypassing failure injection
    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.entries.write().insert(key.to_string(), value.to_vec());
    }
}

fn unavailable() -> CacheError {
    CacheError::Connection("cache unavailable".to_string())
}

#[async_trait]
impl CacheGateway for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.deleted.lock().push(key.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.entries.write().remove(key);
        Ok(())
    }
}
