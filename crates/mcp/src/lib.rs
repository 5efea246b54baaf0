//! RoomieMatch MCP (Model Context Protocol) Server
//!
//! Exposes the room listing tools to chat agents. Every call is authorized by the
//! [`AuthGate`](roomie_core::AuthGate) before any argument is looked at.
//!
//! ## Architecture
//!
//! - `tools`: the tool registry, JSON schemas, and argument validation
//! - `dispatcher`: [`ToolDispatcher`], which routes a validated call to the resolver and store
//!   and formats the reply
//! - `server`: [`RoomieMcpServer`], the rmcp handler served over streamable HTTP
//! - `credentials`: reading the bearer token and caller identity from request headers

mod credentials;
mod dispatcher;
mod server;
mod tools;

pub use credentials::{credential_from_headers, IDENTITY_HEADER};
pub use dispatcher::{ToolDispatcher, ToolReply};
pub use server::RoomieMcpServer;
pub use tools::{parse_call, tool_specs, ArgKind, ArgSpec, ToolCall, ToolSpec};

use rmcp::model::ErrorCode;
use rmcp::ErrorData;
use thiserror::Error;

use roomie_core::errors::{AuthError, ToolError};

/// Failures that surface as JSON-RPC errors instead of chat replies.
#[derive(Error, Debug)]
pub enum McpError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Unauthorized(_) => -32001,
            McpError::Tool(_) => -32602,
            McpError::Internal(_) => -32603,
        }
    }

    /// Invalid-argument errors carry the offending field names as structured data.
    pub fn into_error_data(self) -> ErrorData {
        let data = match &self {
            McpError::Tool(ToolError::InvalidArguments { fields }) => {
                Some(serde_json::json!({ "fields": fields }))
            }
            McpError::Tool(ToolError::UnknownTool { name }) => {
                Some(serde_json::json!({ "tool": name }))
            }
            _ => None,
        };
        ErrorData::new(ErrorCode(self.error_code()), self.to_string(), data)
    }
}

impl From<McpError> for ErrorData {
    fn from(error: McpError) -> Self {
        error.into_error_data()
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use roomie_core::errors::{AuthError, ToolError};

    use super::McpError;

    #[test]
    fn error_codes_follow_json_rpc_conventions() {
        assert_eq!(McpError::from(AuthError::InvalidToken).error_code(), -32001);
        assert_eq!(McpError::from(AuthError::IdentityMismatch).error_code(), -32001);
        assert_eq!(
            McpError::from(ToolError::UnknownTool { name: "book_room".to_string() }).error_code(),
            -32602
        );
        assert_eq!(McpError::Internal("boom".to_string()).error_code(), -32603);
    }

    #[test]
    fn invalid_arguments_carry_field_names() {
        let error = McpError::from(ToolError::InvalidArguments {
            fields: vec!["location".to_string(), "fields.rent_amount".to_string()],
        });
        let data = error.into_error_data();
        assert_eq!(data.code.0, -32602);
        assert_eq!(
            data.data,
            Some(serde_json::json!({ "fields": ["location", "fields.rent_amount"] }))
        );
        assert!(data.message.contains("fields.rent_amount"));
    }
}
