//! cache_generations tool implementation.
//!
//! Lists the generations in the store and marks the current one.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::CacheStorage;

use crate::tools::json_result;

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    /// Generation the running version reads and writes.
    pub current: String,
    /// All generations in the store, oldest first.
    pub generations: Vec<String>,
    /// Generations that the next activation will delete.
    pub stale: Vec<String>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(store: &dyn CacheStorage, current: &str) -> Result<CallToolResult, McpError> {
    let generations = store.keys().await?;
    let stale = generations.iter().filter(|name| *name != current).cloned().collect();

    json_result(&CacheGenerationsOutput { current: current.to_string(), generations, stale })
}
