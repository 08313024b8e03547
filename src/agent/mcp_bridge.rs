//! [`BrowserAgent`] backed by an upstream MCP automation service.
//!
//! Each connect starts a fresh rmcp client session (child process over stdio,
//! or streamable HTTP) and every agent method becomes a `call_tool` on it.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use rmcp::{
    ServiceExt,
    model::{
        CallToolRequest, CallToolRequestParams, CallToolResult, ClientRequest, Content,
        CustomResult, ServerResult,
    },
    service::{Peer, RoleClient, RunningService},
    transport::{
        ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess,
        streamable_http_client::StreamableHttpClientTransportConfig,
    },
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    AgentConnector, AgentError, BrowserAgent, ConnectOptions, LocateOptions, ScriptOutcome,
    ScrollParam,
};
use crate::config::AgentServiceConfig;

type UpstreamService = RunningService<RoleClient, ()>;

async fn start_stdio_service(
    command: &str,
    args: &[String],
    env: &std::collections::BTreeMap<String, String>,
) -> Result<UpstreamService> {
    info!("Starting agent service `{command}` over stdio");

    let mut cmd = Command::new(command);
    if !args.is_empty() {
        cmd.args(args.iter().cloned());
    }
    if !env.is_empty() {
        cmd.envs(env.iter().map(|(k, v)| (k, v)));
    }

    let child = TokioChildProcess::new(cmd.configure(|cmd| {
        cmd.kill_on_drop(true);
    }))?;

    Ok(().serve(child).await?)
}

async fn start_http_service(url: &str, auth_token: Option<&str>) -> Result<UpstreamService> {
    info!("Connecting to agent service at `{url}` over streamable HTTP");

    let mut config = StreamableHttpClientTransportConfig::with_uri(url);
    if let Some(token) = auth_token {
        config = config.auth_header(token);
    }
    let transport = StreamableHttpClientTransport::from_config(config);

    Ok(().serve(transport).await?)
}

async fn start_service(cfg: &AgentServiceConfig) -> Result<UpstreamService> {
    match cfg {
        AgentServiceConfig::Stdio { command, args, env } => {
            start_stdio_service(command, args, env).await
        }
        AgentServiceConfig::Http { url, auth_token } => {
            start_http_service(url, auth_token.as_deref()).await
        }
    }
}

/// Joins the text blocks of a tool result.
fn content_text(content: &[Content]) -> String {
    content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Structured content when the upstream provides it, otherwise the text.
fn result_value(result: CallToolResult) -> Value {
    match result.structured_content {
        Some(value) => value,
        None => Value::String(content_text(&result.content)),
    }
}

/// Reads the reply to a `tools/call`.
///
/// rmcp only accepts a `CallToolResult` that carries content or structured
/// content. Void agent methods answer with neither, so their replies surface
/// as an empty or custom result and are decoded here instead.
fn call_tool_result(response: ServerResult) -> Result<CallToolResult, AgentError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct BareResult {
        #[serde(default)]
        content: Vec<Content>,
        structured_content: Option<Value>,
        is_error: Option<bool>,
    }

    let value = match response {
        ServerResult::CallToolResult(result) => return Ok(result),
        ServerResult::EmptyResult(_) => return Ok(CallToolResult::success(Vec::new())),
        ServerResult::CustomResult(CustomResult(value)) => value,
        other => {
            return Err(AgentError::Transport(format!(
                "unexpected reply to tools/call: {:?}",
                other
            )));
        }
    };

    let bare: BareResult = serde_json::from_value(value)
        .map_err(|e| AgentError::Transport(format!("malformed tools/call reply: {}", e)))?;
    Ok(CallToolResult {
        content: bare.content,
        structured_content: bare.structured_content,
        is_error: bare.is_error,
        meta: None,
    })
}

fn locate_args(locate: Option<&str>, options: LocateOptions) -> serde_json::Map<String, Value> {
    let mut args = serde_json::Map::new();
    if let Some(locate) = locate {
        args.insert("locate".into(), json!(locate));
    }
    args.insert("deepThink".into(), json!(options.deep_think));
    args
}

/// Creates [`McpBridgeAgent`]s from an [`AgentServiceConfig`].
pub struct McpBridgeConnector {
    service: AgentServiceConfig,
}

impl McpBridgeConnector {
    pub fn new(service: AgentServiceConfig) -> Self {
        Self { service }
    }

    async fn open(&self, tool: &'static str, args: Value) -> Result<Arc<dyn BrowserAgent>, AgentError> {
        let service = start_service(&self.service)
            .await
            .map_err(|e| AgentError::Transport(format!("{:#}", e)))?;

        let agent = McpBridgeAgent {
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            shut_down: AtomicBool::new(false),
        };

        if let Err(e) = agent.invoke(tool, args).await {
            // Do not leave the upstream session running for a failed connect.
            agent.shutdown().await;
            return Err(e);
        }

        Ok(Arc::new(agent))
    }
}

#[async_trait]
impl AgentConnector for McpBridgeConnector {
    async fn connect_current_tab(
        &self,
        options: ConnectOptions,
    ) -> Result<Arc<dyn BrowserAgent>, AgentError> {
        self.open(
            "connect_current_tab",
            json!({ "forceSameTabNavigation": options.force_same_tab_navigation }),
        )
        .await
    }

    async fn connect_new_tab(
        &self,
        url: &str,
        options: ConnectOptions,
    ) -> Result<Arc<dyn BrowserAgent>, AgentError> {
        self.open(
            "connect_new_tab",
            json!({ "url": url, "forceSameTabNavigation": options.force_same_tab_navigation }),
        )
        .await
    }
}

/// A browser tab driven through an upstream MCP session.
pub struct McpBridgeAgent {
    peer: Peer<RoleClient>,
    /// Held for teardown; `None` once shut down.
    service: Mutex<Option<UpstreamService>>,
    shut_down: AtomicBool,
}

impl McpBridgeAgent {
    async fn invoke(&self, tool: &'static str, args: Value) -> Result<CallToolResult, AgentError> {
        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(AgentError::Transport(format!(
                    "arguments for `{}` must be an object, got {}",
                    tool, other
                )));
            }
        };

        let request = CallToolRequestParams {
            meta: None,
            name: Cow::Borrowed(tool),
            arguments,
            task: None,
        };

        debug!(tool, "Calling agent service");
        let response = self
            .peer
            .send_request(ClientRequest::CallToolRequest(CallToolRequest::new(request)))
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;
        let result = call_tool_result(response)?;

        if result.is_error.unwrap_or(false) {
            return Err(AgentError::Runtime(content_text(&result.content)));
        }
        Ok(result)
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        if let Some(service) = self.service.lock().await.take() {
            if let Err(e) = service.cancel().await {
                warn!("Agent service did not shut down cleanly: {}", e);
            }
        }
    }
}

#[async_trait]
impl BrowserAgent for McpBridgeAgent {
    async fn destroy(&self, close_new_tabs: bool) -> Result<(), AgentError> {
        self.invoke(
            "destroy",
            json!({ "closeNewTabsAfterDisconnect": close_new_tabs }),
        )
        .await?;
        self.shutdown().await;
        Ok(())
    }

    async fn ai_action(&self, prompt: &str) -> Result<(), AgentError> {
        self.invoke("ai_action", json!({ "prompt": prompt })).await?;
        Ok(())
    }

    async fn ai_tap(&self, locate: &str, options: LocateOptions) -> Result<(), AgentError> {
        self.invoke("ai_tap", Value::Object(locate_args(Some(locate), options)))
            .await?;
        Ok(())
    }

    async fn ai_hover(&self, locate: &str, options: LocateOptions) -> Result<(), AgentError> {
        self.invoke("ai_hover", Value::Object(locate_args(Some(locate), options)))
            .await?;
        Ok(())
    }

    async fn ai_input(
        &self,
        text: &str,
        locate: &str,
        options: LocateOptions,
    ) -> Result<(), AgentError> {
        let mut args = locate_args(Some(locate), options);
        args.insert("text".into(), json!(text));
        self.invoke("ai_input", Value::Object(args)).await?;
        Ok(())
    }

    async fn ai_keyboard_press(
        &self,
        key: &str,
        locate: Option<&str>,
        options: LocateOptions,
    ) -> Result<(), AgentError> {
        let mut args = locate_args(locate, options);
        args.insert("key".into(), json!(key));
        self.invoke("ai_keyboard_press", Value::Object(args)).await?;
        Ok(())
    }

    async fn ai_scroll(
        &self,
        param: &ScrollParam,
        locate: Option<&str>,
        options: LocateOptions,
    ) -> Result<(), AgentError> {
        let mut args = locate_args(locate, options);
        let param = serde_json::to_value(param)
            .map_err(|e| AgentError::Transport(format!("failed to encode scroll param: {}", e)))?;
        args.insert("scrollParam".into(), param);
        self.invoke("ai_scroll", Value::Object(args)).await?;
        Ok(())
    }

    async fn ai_query(&self, data_shape: &str) -> Result<Value, AgentError> {
        let result = self
            .invoke("ai_query", json!({ "dataShape": data_shape }))
            .await?;
        Ok(result_value(result))
    }

    async fn ai_assert(&self, assertion: &str) -> Result<(), AgentError> {
        self.invoke("ai_assert", json!({ "assertion": assertion }))
            .await?;
        Ok(())
    }

    async fn ai_boolean(&self, condition: &str) -> Result<bool, AgentError> {
        let result = self
            .invoke("ai_boolean", json!({ "condition": condition }))
            .await?;
        match result_value(result) {
            Value::Bool(b) => Ok(b),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
            other => Err(AgentError::Transport(format!(
                "ai_boolean returned a non-boolean result: {}",
                other
            ))),
        }
    }

    async fn run_yaml(&self, script: &str) -> Result<ScriptOutcome, AgentError> {
        let result = self
            .invoke("run_yaml", json!({ "yamlScriptContent": script }))
            .await?;
        let result = match result_value(result) {
            Value::Object(mut map) if map.contains_key("result") => {
                map.remove("result").unwrap_or(Value::Null)
            }
            other => other,
        };
        Ok(ScriptOutcome { result })
    }

    async fn set_ai_action_context(&self, context: &str) -> Result<(), AgentError> {
        self.invoke("set_ai_action_context", json!({ "actionContext": context }))
            .await?;
        Ok(())
    }

    async fn evaluate_javascript(&self, script: &str) -> Result<Value, AgentError> {
        let result = self
            .invoke("evaluate_javascript", json!({ "script": script }))
            .await?;
        Ok(result_value(result))
    }

    fn is_closed(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst) || self.peer.is_transport_closed()
    }
}
