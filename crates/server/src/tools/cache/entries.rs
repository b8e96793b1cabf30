//! cache_entries tool implementation.
//!
//! Lists the entries of one generation (the current one by default).

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheStorage, EntrySummary, Error};

use crate::tools::json_result;

/// Parameters for the cache_entries tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesParams {
    /// Generation to list; defaults to the current one.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_entries tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesOutput {
    pub generation: String,
    pub entries: Vec<EntrySummary>,
}

/// Implementation of the cache_entries tool.
pub async fn entries_impl(
    store: &dyn CacheStorage, current: &str, params: CacheEntriesParams,
) -> Result<CallToolResult, McpError> {
    let generation = params.generation.unwrap_or_else(|| current.to_string());

    if !store.keys().await?.contains(&generation) {
        return Err(Error::CacheMiss(format!("no generation named {generation}")).into());
    }

    let entries = store.entries(&generation).await?;
    json_result(&CacheEntriesOutput { generation, entries })
}
