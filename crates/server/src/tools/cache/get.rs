//! cache_get tool implementation.
//!
//! Reads the current namespace's entry for a URL without touching the network.

use offcache_client::fetch::resolve;
use offcache_core::{Error, RequestDescriptor};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub namespace: String,
    pub key: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub stored_at: String,
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(state: &AppState, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(&state.origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = RequestDescriptor::get(url);

    let entry = state
        .router
        .cached(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.url().to_string()))?;

    let output = CacheGetOutput {
        namespace: state.router.namespace().to_string(),
        key: entry.key,
        url: entry.url,
        status: entry.response.status,
        content_type: entry.response.content_type.clone(),
        headers: entry.response.headers.clone(),
        stored_at: entry.stored_at.to_rfc3339(),
        body: entry.response.text(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
