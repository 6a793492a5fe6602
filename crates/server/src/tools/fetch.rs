//! cache_fetch tool implementation.
//!
//! Routes one request through the offline-first strategies and reports which
//! strategy answered and where the response came from.

use offcache_client::{Connectivity, fetch::resolve};
use offcache_core::RequestDescriptor;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::state::AppState;

/// Parameters for the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,

    /// HTTP method: GET (default) or HEAD. Requests carry no body and only GET
    /// responses are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the network as unavailable. Defaults to the server setting.
    #[serde(default)]
    pub offline: Option<bool>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchOutput {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Strategy that handled the request.
    pub strategy: String,
    /// "cache" or "network".
    pub source: String,
    /// When the served entry was stored, for cache responses.
    pub stored_at: Option<String>,
    pub body: String,
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl(state: &AppState, params: CacheFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }
    let method = params.method.trim().to_ascii_uppercase();
    if method.is_empty() {
        return Err(ToolError::InvalidInput("method cannot be empty".into()).into());
    }
    if !matches!(method.as_str(), "GET" | "HEAD") {
        return Err(ToolError::InvalidInput(format!("unsupported method {method}: only GET and HEAD are supported")).into());
    }

    let url = resolve(&state.origin, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let request = RequestDescriptor::new(&method, url);
    let connectivity = Connectivity::from(!params.offline.unwrap_or(state.offline));

    let served = state.router.route(&request, connectivity).await.map_err(ToolError::from)?;

    let output = CacheFetchOutput {
        url: request.url().to_string(),
        method: request.method().to_string(),
        status: served.response.status,
        content_type: served.response.content_type.clone(),
        strategy: served.strategy.as_str().to_string(),
        source: served.source.as_str().to_string(),
        stored_at: served.stored_at.map(|t| t.to_rfc3339()),
        body: served.response.text(),
    };

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
