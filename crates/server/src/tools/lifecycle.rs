//! sw_install, sw_activate and sw_push tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{PushPayload, ServiceWorker};

use super::json_result;

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwActivateOutput {
    /// The generation that remains.
    pub current: String,
    /// Generations deleted by this activation.
    pub deleted: Vec<String>,
}

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Text of the push message; becomes the notification title.
    #[serde(default)]
    pub text: Option<String>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await;
    json_result(&report)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let deleted = worker.activate().await;
    json_result(&SwActivateOutput { current: worker.generation().to_string(), deleted })
}

/// Implementation of the sw_push tool.
pub async fn push_impl(worker: &ServiceWorker, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.push(&PushPayload { text: params.text }).await;
    json_result(&notification)
}
