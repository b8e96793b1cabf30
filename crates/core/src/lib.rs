//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Generation-based response cache with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheStorage, EntrySummary, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
