//! MCP server handler implementation.
//!
//! Each tool delivers one host signal to the worker, or reads the store.
use std::sync::Arc;

use crate::tools::{
    SwFetchParams, SwPushParams, activate_impl,
    cache::{CacheEntriesParams, entries_impl, generations_impl},
    fetch_impl, install_impl, push_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shellcache_client::ServiceWorker;
use shellcache_core::CacheStorage;

/// The MCP host for the caching worker.
#[derive(Clone)]
pub struct ShellcacheServer {
    worker: Arc<ServiceWorker>,
    store: Arc<dyn CacheStorage>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ShellcacheServer {
    pub fn new(worker: Arc<ServiceWorker>, store: Arc<dyn CacheStorage>) -> Self {
        Self { worker, store, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install signal: precache the application shell into the current cache generation.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate signal: delete every cache generation except the current one.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Network first; on failure the current generation answers.
    #[tool(description = "Fetch signal: handle a request network-first with cache fallback. \
                          Reports whether the answer came from the network or the cache.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Push signal: show a notification titled with the push text.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache generations and which ones are stale.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(self.store.as_ref(), self.worker.generation()).await
    }

    #[tool(description = "List the entries stored in a cache generation (default: current).")]
    async fn cache_entries(&self, params: Parameters<CacheEntriesParams>) -> Result<CallToolResult, McpError> {
        entries_impl(self.store.as_ref(), self.worker.generation(), params.0).await
    }
}

impl ServerHandler for ShellcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
