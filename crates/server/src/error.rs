//! Tool-level errors for the offcache MCP server.
//!
//! Store and config problems convert through `offcache_core::Error`; this
//! type covers bad tool input and requests the router could not answer.

use offcache_client::Failure;
use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid tool parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The router produced no response.
    #[error(transparent)]
    Route(#[from] Failure),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::Route(Failure::NotFoundOffline) => -32010,
            ToolError::Route(Failure::Unreachable) => -32011,
            ToolError::Route(Failure::Timeout) => -32006,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
