//! Storage abstractions for ledger persistence.
//!
//! One record per calendar day, keyed by the `yyyy-mm-dd` date string.
//!
//! ## Directory Structure (local backend)
//!
//! ```text
//! storage/
//! ├── config.toml
//! ├── sent_links_2026-10-18.json
//! └── sent_links_2026-10-19.json
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Notice;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStore;

/// Keyed store of ledgers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load the ledger stored under `key`, `None` if there is none.
    async fn load(&self, key: &str) -> Result<Option<Vec<Notice>>>;

    /// Replace the ledger stored under `key`.
    async fn save(&self, key: &str, entries: &[Notice]) -> Result<()>;

    /// All stored keys, ascending.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Delete the ledger stored under `key`; missing keys are not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
