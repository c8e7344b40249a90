//! In-memory ledger store.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Notice;
use crate::storage::LedgerStore;

/// Ledger store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Vec<Notice>>>,
    writes: AtomicUsize,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `save` always fails.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    /// Number of successful `save` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn records(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<Notice>>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<Notice>>> {
        Ok(self.records().get(key).cloned())
    }

    async fn save(&self, key: &str, entries: &[Notice]) -> Result<()> {
        if self.read_only {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "store is read-only",
            )));
        }
        self.records().insert(key.to_string(), entries.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.records().keys().cloned().collect())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.records().remove(key);
        Ok(())
    }
}
