//! cache_namespaces tool implementation.
//!
//! Lists the namespaces in the store and the keys held by the current one.

use offcache_core::{Error, Namespace};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Parameters for the cache_namespaces tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheNamespacesParams {}

/// Output from the cache_namespaces tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheNamespacesOutput {
    /// Namespace requests are served from.
    pub current: Namespace,
    /// Every namespace in the store, sorted by name.
    pub namespaces: Vec<Namespace>,
    /// URLs cached in the current namespace.
    pub keys: Vec<String>,
}

/// Implementation of the cache_namespaces tool.
pub async fn namespaces_impl(state: &AppState, _params: CacheNamespacesParams) -> Result<CallToolResult, McpError> {
    let current = state.router.namespace().clone();
    let namespaces = state.store.list_namespaces().await?;
    let keys = state.store.keys(&current).await?;

    let output = CacheNamespacesOutput { current, namespaces, keys };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticNetwork, app_config, router_config};
    use offcache_core::CacheDb;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_namespaces_impl_lists_current() {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let network = Arc::new(StaticNetwork::with_site());
        let router = crate::state::start(store.clone(), network, &app_config(), router_config())
            .await
            .unwrap();
        let state = AppState::new(router, store, false);

        let result = namespaces_impl(&state, CacheNamespacesParams::default()).await.unwrap();
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let output: CacheNamespacesOutput = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();

        assert_eq!(output.current, Namespace::versioned("offcache", 2));
        assert_eq!(output.namespaces, vec![Namespace::versioned("offcache", 2)]);
        assert_eq!(output.keys.len(), 2);
    }
}
