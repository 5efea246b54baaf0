//! MCP Server Implementation
//!
//! Implements the Model Context Protocol handler for RoomieMatch. Tool schemas come from the
//! static registry in `tools`; every call is re-authorized from the HTTP request headers that
//! the streamable HTTP transport attaches to the request context.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use tracing::debug;

use roomie_core::AuthCredential;

use crate::credentials::credential_from_headers;
use crate::dispatcher::ToolDispatcher;
use crate::tools::{tool_specs, ToolSpec};

/// Main MCP server for RoomieMatch
#[derive(Clone)]
pub struct RoomieMcpServer {
    dispatcher: Arc<ToolDispatcher>,
    tools: Arc<Vec<Tool>>,
}

impl RoomieMcpServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        let tools = tool_specs().iter().map(to_tool).collect();
        Self { dispatcher: Arc::new(dispatcher), tools: Arc::new(tools) }
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Runs one `tools/call`. Failed requests come back as `is_error` results; only auth and
    /// argument problems become protocol errors.
    pub async fn handle_call(
        &self,
        credential: &AuthCredential,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ErrorData> {
        debug!(event_name = "mcp.tool.received", tool = %request.name, "tools/call received");
        let reply =
            self.dispatcher.call(credential, &request.name, request.arguments.as_ref()).await?;
        let content = vec![Content::text(reply.text)];
        Ok(if reply.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        })
    }
}

fn to_tool(spec: &ToolSpec) -> Tool {
    Tool::new(spec.name, spec.description, Arc::new(spec.input_schema()))
}

impl ServerHandler for RoomieMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "RoomieMatch - find, list, edit, and delete rental room listings. \
                 Use chat_room_request for free-text messages in English or Hinglish, \
                 or the structured tools when the fields are already known."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools.as_ref().clone()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let credential = context
            .extensions
            .get::<http::request::Parts>()
            .map(|parts| credential_from_headers(&parts.headers))
            .unwrap_or_default();
        self.handle_call(&credential, request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rmcp::model::{CallToolRequestParam, CallToolResult};
    use rmcp::ServerHandler;
    use secrecy::SecretString;
    use serde_json::json;

    use roomie_agent::IntentResolver;
    use roomie_core::audit::NoopAuditSink;
    use roomie_core::config::AppConfig;
    use roomie_core::{AuthCredential, AuthGate};
    use roomie_db::{InMemoryRoomStore, RoomStore};

    use super::RoomieMcpServer;
    use crate::dispatcher::ToolDispatcher;
    use crate::tools::ALL_TOOL_NAMES;

    fn server() -> RoomieMcpServer {
        let config = AppConfig::default();
        let store: Arc<dyn RoomStore> = Arc::new(InMemoryRoomStore::default());
        let gate = AuthGate::new(&SecretString::from("tok".to_string()), None, Vec::new());
        let resolver =
            IntentResolver::rule_based(Arc::clone(&store), &config.resolver, config.listings);
        RoomieMcpServer::new(ToolDispatcher::new(gate, store, resolver, Arc::new(NoopAuditSink)))
    }

    fn request(name: &'static str, arguments: serde_json::Value) -> CallToolRequestParam {
        CallToolRequestParam { name: name.into(), arguments: arguments.as_object().cloned() }
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|content| content.as_text().map(|text| text.text.clone()))
            .collect()
    }

    #[test]
    fn advertises_every_tool() {
        let server = server();
        let names: Vec<&str> = server.tools().iter().map(|tool| tool.name.as_ref()).collect();
        assert_eq!(names, ALL_TOOL_NAMES);
        assert!(server.get_info().capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn bad_token_is_a_protocol_error() {
        let error = server()
            .handle_call(&AuthCredential::new("nope", None), request("get_help", json!({})))
            .await
            .expect_err("rejected");
        assert_eq!(error.code.0, -32001);
    }

    #[tokio::test]
    async fn store_refusals_are_error_results() {
        let result = server()
            .handle_call(
                &AuthCredential::new("tok", None),
                request("delete_room", json!({ "room_id": "R404" })),
            )
            .await
            .expect("tool result");
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("no active room"));
    }

    #[tokio::test]
    async fn help_is_a_plain_result() {
        let result = server()
            .handle_call(&AuthCredential::new("tok", None), request("get_help", json!({})))
            .await
            .expect("tool result");
        assert_eq!(result.is_error, Some(false));
        assert!(text(&result).contains("RoomieMatch"));
    }
}
