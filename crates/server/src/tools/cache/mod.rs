//! Cache inspection tools.
//!
//! Read-only views of the generation store.

pub mod entries;
pub mod generations;

pub use entries::{CacheEntriesParams, entries_impl};
pub use generations::generations_impl;
