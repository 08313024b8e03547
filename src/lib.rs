// Core modules
pub mod agent;
pub mod config;
mod error;
pub mod session;
mod utils;
mod wait_for;

// MCP surface
pub mod server;
pub mod tools;

#[cfg(test)]
mod testing;

// Re-export key types and functions
pub use agent::{AgentConnector, AgentError, BrowserAgent, McpBridgeAgent, McpBridgeConnector};
pub use config::{AgentServiceConfig, BridgeConfig, load_bridge_config};
pub use error::ToolError;
pub use server::{McpServer, serve_mcp_http, start_mcp_http};
pub use session::{BrowserSession, SessionError};
pub use tools::{ToolHandler, ToolRegistry, default_registry};
pub use wait_for::{WaitForOptions, wait_for_condition};

use std::sync::Arc;

use anyhow::Result;

/// Convenience function to create a fully configured MCP server.
///
/// Registers every browser tool and wires the connection slot to the
/// configured agent service. No agent is started until a connect tool runs.
pub fn create_server(config: BridgeConfig) -> Result<McpServer> {
    tracing::info!(agent = %config.agent.describe(), "Configuring browser agent service");

    let connector = Arc::new(McpBridgeConnector::new(config.agent));
    let session = BrowserSession::new(connector);
    let registry = Arc::new(default_registry()?);

    let mut server = McpServer::new(registry, session).with_name(config.server_name);
    if let Some(instructions) = config.instructions {
        server = server.with_instructions(instructions);
    }
    Ok(server)
}
