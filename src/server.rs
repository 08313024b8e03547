//! MCP server implementation using rmcp.
//!
//! Exposes the browser tools over stdio or streamable HTTP. Every transport
//! session of one process shares the same connection slot.

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio::net::TcpListener;
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
};

use crate::session::{BrowserSession, SessionError};
use crate::tools::{ToolContext, ToolRegistry};

const DEFAULT_INSTRUCTIONS: &str = "Drives a single browser tab with natural-language automation tools. \
     Call browser_connect_current_tab or browser_connect_new_tab first; every other tool \
     requires an active connection. Only one tab can be connected at a time; call \
     browser_disconnect before connecting again.";

/// MCP server that handles protocol requests and delegates to tool handlers.
#[derive(Clone)]
pub struct McpServer {
    tool_registry: Arc<ToolRegistry>,
    context: ToolContext,
    name: String,
    instructions: Option<String>,
}

impl McpServer {
    /// Create a new MCP server over the given registry and connection slot.
    pub fn new(tool_registry: Arc<ToolRegistry>, session: BrowserSession) -> Self {
        Self {
            tool_registry,
            context: ToolContext { session },
            name: env!("CARGO_PKG_NAME").to_string(),
            instructions: Some(DEFAULT_INSTRUCTIONS.to_string()),
        }
    }

    /// Override the advertised server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the instructions returned from `initialize`.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Get the tool registry.
    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    /// Get the shared connection slot.
    pub fn session(&self) -> &BrowserSession {
        &self.context.session
    }

    /// Tear down any connected agent. Called once the transport has closed.
    pub async fn release(&self) {
        match self.context.session.disconnect(false).await {
            Ok(()) | Err(SessionError::NotConnected) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to tear down browser agent on shutdown"),
        }
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        InitializeResult {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: self.instructions.clone(),
        }
    }

    fn initialize(
        &self,
        request: InitializeRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<InitializeResult, McpError>> + Send + '_ {
        tracing::info!(
            client = %request.client_info.name,
            client_version = %request.client_info.version,
            "MCP client initialized"
        );
        if context.peer.peer_info().is_none() {
            context.peer.set_peer_info(request);
        }
        std::future::ready(Ok(self.get_info()))
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let result = ListToolsResult {
            tools: self.tool_registry.list_tools(),
            ..Default::default()
        };
        std::future::ready(Ok(result))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let tool_name = request.name.to_string();
        let args = request.arguments.unwrap_or_default();
        let registry = self.tool_registry.clone();
        let ctx = self.context.clone();

        // Tool failures travel inside the result; the protocol call itself
        // always succeeds.
        async move { Ok(registry.call_tool(&tool_name, args, &ctx).await) }
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tool_registry.get(name).map(|h| h.to_mcp_tool())
    }
}

/// Serve the MCP server over streamable HTTP at `/mcp` until Ctrl-C.
pub async fn start_mcp_http(server: McpServer, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    tracing::info!("MCP HTTP server listening on http://{}/mcp", listener.local_addr()?);

    serve_mcp_http(server, listener, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// Serve on an already bound listener until `shutdown` resolves, then tear
/// down the connected agent.
///
/// Each HTTP session gets a clone of `server`, so all sessions share the
/// registry and the connection slot.
pub async fn serve_mcp_http(
    server: McpServer,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let config = StreamableHttpServerConfig::default();
    let sessions = config.cancellation_token.clone();
    let service = StreamableHttpService::new(
        {
            let server = server.clone();
            move || Ok(server.clone())
        },
        LocalSessionManager::default().into(),
        config,
    );

    let router = Router::new().nest_service("/mcp", service);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutting down MCP HTTP server");
            // Open SSE streams would otherwise hold the graceful shutdown.
            sessions.cancel();
        })
        .await;

    server.release().await;
    Ok(served?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::agent::ConnectOptions;
    use crate::session::ConnectTarget;
    use crate::testing::{MockConnector, ScriptedAgent};
    use crate::tools::default_registry;

    fn test_server(connector: &MockConnector) -> McpServer {
        McpServer::new(
            Arc::new(default_registry().unwrap()),
            BrowserSession::new(connector.clone().into_arc()),
        )
    }

    #[tokio::test]
    async fn test_release_destroys_the_connected_agent() {
        let agent = ScriptedAgent::new();
        let server = test_server(&MockConnector::with_agent(agent.clone()));
        server
            .session()
            .connect(ConnectTarget::CurrentTab, ConnectOptions::default())
            .await
            .unwrap();

        server.release().await;

        assert!(!server.session().is_connected());
        assert_eq!(agent.calls(), vec!["destroy(close_new_tabs=false)"]);
    }

    #[tokio::test]
    async fn test_release_without_connection_is_quiet() {
        let server = test_server(&MockConnector::new());
        server.release().await;
        assert!(!server.session().is_connected());
    }

    #[tokio::test]
    async fn test_release_keeps_slot_when_teardown_fails() {
        let agent = ScriptedAgent::new().failing_destroy("tab already gone");
        let server = test_server(&MockConnector::with_agent(agent.clone()));
        server
            .session()
            .connect(ConnectTarget::CurrentTab, ConnectOptions::default())
            .await
            .unwrap();

        server.release().await;

        assert!(server.session().is_connected());
    }

    #[tokio::test]
    async fn test_http_shutdown_releases_the_agent() {
        let agent = ScriptedAgent::new();
        let server = test_server(&MockConnector::with_agent(agent.clone()));
        server
            .session()
            .connect(ConnectTarget::CurrentTab, ConnectOptions::default())
            .await
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(serve_mcp_http(server.clone(), listener, async move {
            let _ = shutdown_rx.await;
        }));

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();

        assert!(!server.session().is_connected());
        assert_eq!(agent.calls(), vec!["destroy(close_new_tabs=false)"]);
    }
}
