use std::path::PathBuf;

use anyhow::Result;
use browser_bridge_mcp::{
    AgentServiceConfig, create_server, default_registry, load_bridge_config, start_mcp_http,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

// rmcp imports for MCP stdio server mode
use rmcp::service::ServiceExt;
use rmcp::transport::stdio;

#[derive(Parser)]
#[command(name = "browser-bridge-mcp")]
#[command(about = "MCP bridge exposing natural-language browser automation tools")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true, env = "BROWSER_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Command that starts the automation agent as an MCP stdio service
    #[arg(long, global = true, env = "BROWSER_BRIDGE_AGENT_COMMAND", conflicts_with = "agent_url")]
    agent_command: Option<String>,

    /// Argument passed to --agent-command (repeatable)
    #[arg(long = "agent-arg", global = true, allow_hyphen_values = true)]
    agent_args: Vec<String>,

    /// Streamable HTTP endpoint of the automation agent
    #[arg(long, global = true, env = "BROWSER_BRIDGE_AGENT_URL")]
    agent_url: Option<String>,

    /// Bearer token sent to --agent-url
    #[arg(long, global = true, env = "BROWSER_BRIDGE_AGENT_TOKEN", hide_env_values = true)]
    agent_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as an MCP stdio server (for use in mcp.json)
    McpStdio,
    /// Run as an MCP HTTP server
    McpHttp {
        /// Bind address, e.g. 0.0.0.0:3942
        #[arg(long, default_value = "127.0.0.1:3942")]
        bind: String,
    },
    /// Print the tool catalog and exit
    ListTools,
}

impl Cli {
    fn agent_override(&self) -> Option<AgentServiceConfig> {
        if let Some(command) = &self.agent_command {
            return Some(AgentServiceConfig::Stdio {
                command: command.clone(),
                args: self.agent_args.clone(),
                env: Default::default(),
            });
        }
        self.agent_url.as_ref().map(|url| AgentServiceConfig::Http {
            url: url.clone(),
            auth_token: self.agent_token.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the stdio transport, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("browser_bridge_mcp=info".parse()?)
                .add_directive("rmcp=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::ListTools => {
            let registry = default_registry()?;
            for tool in registry.list_tools() {
                println!(
                    "{:<32} {}",
                    tool.name,
                    tool.description.as_deref().unwrap_or_default()
                );
            }
        }
        Commands::McpStdio => {
            let config = load_bridge_config(cli.config.as_deref(), cli.agent_override())?;
            info!("Starting MCP stdio server (rmcp)");

            let server = create_server(config)?;

            // Run as an MCP stdio server. McpServer implements ServerHandler.
            let service = server
                .clone()
                .serve(stdio())
                .await
                .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

            // Block until the MCP session ends, however it ends.
            if let Err(e) = service.waiting().await {
                tracing::error!("MCP stdio session failed: {:?}", e);
            }
            server.release().await;
            info!("MCP stdio server session ended");
        }
        Commands::McpHttp { bind } => {
            let config = load_bridge_config(cli.config.as_deref(), cli.agent_override())?;
            info!("Starting MCP HTTP server (rmcp) on {}", bind);

            let server = create_server(config)?;
            start_mcp_http(server, bind).await?;
            info!("MCP HTTP server stopped");
        }
    }

    Ok(())
}
