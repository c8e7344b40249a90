//! Service layer for the notice watcher.
//!
//! This module contains the collaborators the pipeline drives:
//! - Listing page fetching (`ListingFetcher`)
//! - Candidate filtering (`EntryFilter`)
//! - Signed webhook delivery (`DingTalkNotifier`)

mod filter;
mod listing;
mod notifier;

pub use filter::{EntryFilter, Rejection};
pub use listing::{ListingFetcher, ListingParser, ListingSource};
pub use notifier::{DingTalkNotifier, Notifier, sign};
