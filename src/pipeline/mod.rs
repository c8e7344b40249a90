//! Pipeline entry points for watcher operations.
//!
//! - `Paginator`: walks listing pages with early stop
//! - `DedupLedger`: merges a run's notices into the day's ledger
//! - `DigestFormatter`: renders the ledger as a markdown message
//! - `run_watch`: one complete run against the configured site

pub mod digest;
pub mod ledger;
pub mod paginate;
pub mod run;

pub use digest::{Digest, DigestFormatter};
pub use ledger::{DedupLedger, MergeOutcome, merge};
pub use paginate::{PageDecision, Paginator, StopReason};
pub use run::{NotifyStatus, Orchestrator, RunReport, run_watch};
