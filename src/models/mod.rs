// src/models/mod.rs

//! Domain models for the notice watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod context;
mod notice;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, ExtractionConfig, FilterConfig, LoggingConfig, MessageConfig,
    NoNewPolicy, NotifyConfig, NotifyCredentials, SiteConfig, StorageConfig,
};
pub use context::RunContext;
pub use notice::{Candidate, Notice};
