//! Dedup ledger.
//!
//! The ledger is the list of notices already surfaced for one day, most
//! recently discovered first. New notices are those whose link the ledger
//! has not seen; they are prepended and the ledger is written back.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::Notice;
use crate::storage::LedgerStore;

/// Result of merging a run's notices into the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Full ledger after the merge
    pub ledger: Vec<Notice>,
    /// Notices not previously in the ledger, in discovery order
    pub added: Vec<Notice>,
    /// Whether the merged ledger was written to the store
    pub persisted: bool,
}

impl MergeOutcome {
    pub fn has_new(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Split `discovered` into notices unknown to `existing` and build the merged ledger.
///
/// A link repeated within `discovered` is taken once, first occurrence wins.
pub fn merge(existing: &[Notice], discovered: &[Notice]) -> (Vec<Notice>, Vec<Notice>) {
    let mut seen: HashSet<&str> = existing.iter().map(|n| n.link.as_str()).collect();

    let added: Vec<Notice> = discovered
        .iter()
        .filter(|n| seen.insert(n.link.as_str()))
        .cloned()
        .collect();

    let ledger = added.iter().chain(existing.iter()).cloned().collect();
    (ledger, added)
}

/// Drop later entries that repeat an earlier link.
fn dedup_by_link(entries: Vec<Notice>) -> Vec<Notice> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|n| seen.insert(n.link.clone()))
        .collect()
}

/// Ledger operations over a keyed store.
pub struct DedupLedger<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> DedupLedger<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    /// Load the ledger for `key`; missing or unreadable records give an empty ledger.
    pub async fn load(&self, key: &str) -> Vec<Notice> {
        match self.store.load(key).await {
            Ok(Some(entries)) => {
                let count = entries.len();
                let entries = dedup_by_link(entries);
                if entries.len() != count {
                    log::warn!(
                        "Ledger {} held {} duplicate links; keeping first occurrences",
                        key,
                        count - entries.len()
                    );
                }
                log::info!("Loaded {} ledger entries for {}", entries.len(), key);
                entries
            }
            Ok(None) => {
                log::info!("No ledger for {} yet", key);
                Vec::new()
            }
            Err(error) => {
                log::warn!("Failed to load ledger {}: {}. Starting empty.", key, error);
                Vec::new()
            }
        }
    }

    /// Merge `discovered` into `existing` and persist when anything is new.
    ///
    /// A failed write is logged; the merged result is still returned.
    pub async fn merge_and_persist(
        &self,
        key: &str,
        existing: &[Notice],
        discovered: &[Notice],
    ) -> MergeOutcome {
        let (ledger, added) = merge(existing, discovered);
        if added.is_empty() {
            return MergeOutcome {
                ledger,
                added,
                persisted: false,
            };
        }

        let persisted = match self.store.save(key, &ledger).await {
            Ok(()) => true,
            Err(error) => {
                log::error!("Failed to save ledger {}: {}", key, error);
                false
            }
        };

        MergeOutcome {
            ledger,
            added,
            persisted,
        }
    }

    /// Remove ledgers for days before `cutoff`, returning the removed keys.
    ///
    /// Keys that are not dates are left alone.
    pub async fn prune(&self, cutoff: NaiveDate) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for key in self.store.keys().await? {
            let Ok(day) = NaiveDate::parse_from_str(&key, "%Y-%m-%d") else {
                continue;
            };
            if day < cutoff {
                self.store.remove(&key).await?;
                log::info!("Removed ledger {}", key);
                removed.push(key);
            }
        }
        Ok(removed)
    }
}
