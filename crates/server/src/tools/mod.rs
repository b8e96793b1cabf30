//! MCP tool implementations.
//!
//! One tool per lifecycle signal, plus read-only cache inspection.

pub mod cache;
pub mod lifecycle;
pub mod sw_fetch;

pub use lifecycle::{SwPushParams, activate_impl, install_impl, push_impl};
pub use sw_fetch::{SwFetchOutput, SwFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shellcache_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
