//! SQLite-backed store of named cache generations.
//!
//! A generation is a versioned key-value store mapping request identity to a
//! stored response. This module provides:
//!
//! - The [`CacheStorage`] trait the worker components are written against
//! - [`CacheDb`], the SQLite implementation via tokio-rusqlite
//! - Automatic schema migrations and WAL mode
//! - Whole-generation deletion (entries go with their generation)

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, EntrySummary, StoredResponse};
pub use storage::CacheStorage;
