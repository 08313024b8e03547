//! Tool registry and the execution adapter.
//!
//! Provides a `ToolHandler` trait for implementing tools and a `ToolRegistry`
//! that validates arguments, dispatches to handlers and converts every
//! outcome into a `CallToolResult`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool as McpTool};

use crate::error::ToolError;
use crate::session::BrowserSession;
use crate::tools::schema::{ToolArgs, ToolSchema};

/// Future returned by [`ToolHandler::execute`], resolving to the response text.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + 'a>>;

/// Context passed to tool handlers during execution.
#[derive(Clone)]
pub struct ToolContext {
    /// The shared connection slot.
    pub session: BrowserSession,
}

/// Trait for handling MCP tool invocations.
///
/// Each tool implements this trait to define its schema and execution logic.
pub trait ToolHandler: Send + Sync {
    /// Returns the tool's name (e.g., "browser_ai_tap").
    fn name(&self) -> &str;

    /// Returns the tool's human-readable title.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Returns the tool's description.
    fn description(&self) -> &str;

    /// Returns the argument schema for this tool.
    fn schema(&self) -> ToolSchema;

    /// Executes the tool with already-validated arguments, returning the
    /// response text.
    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_>;

    /// Converts this handler to an `McpTool` for use in `list_tools`.
    fn to_mcp_tool(&self) -> McpTool {
        let mut tool = McpTool::new(
            self.name().to_string(),
            self.description().to_string(),
            Arc::new(self.schema().to_json_schema()),
        );
        tool.title = self.title().map(|s| s.to_string());
        tool
    }
}

/// Registry for managing tool handlers.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    /// Registration order, used for listing.
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler. Tool names must be unique.
    pub fn register(mut self, handler: Arc<dyn ToolHandler>) -> Result<Self> {
        let name = handler.name().to_string();
        if self.handlers.contains_key(&name) {
            return Err(anyhow::anyhow!("Duplicate tool name: {}", name));
        }
        self.order.push(name.clone());
        self.handlers.insert(name, handler);
        Ok(self)
    }

    /// Register a tool handler from a type that implements `ToolHandler`.
    pub fn register_handler<T: ToolHandler + 'static>(self, handler: T) -> Result<Self> {
        self.register(Arc::new(handler))
    }

    /// Get a tool handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Get all registered tools as `McpTool` instances for `list_tools`.
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.to_mcp_tool())
            .collect()
    }

    /// Check if a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Return the number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Return `true` if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Execute a tool by name with raw arguments.
    ///
    /// Never fails: unknown tools, schema violations, precondition failures,
    /// agent errors and handler panics all come back as an error result with
    /// a single text block.
    pub async fn call_tool(&self, name: &str, args: JsonObject, ctx: &ToolContext) -> CallToolResult {
        let started = Instant::now();

        match self.dispatch(name, args, ctx).await {
            Ok(text) => {
                tracing::debug!(
                    tool = name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                CallToolResult::success(vec![Content::text(text)])
            }
            Err(e) => {
                tracing::warn!(
                    tool = name,
                    kind = e.kind(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Tool call failed"
                );
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }

    async fn dispatch(
        &self,
        name: &str,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let handler = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = handler
            .schema()
            .validate(args)
            .map_err(|source| ToolError::InvalidArguments {
                tool: name.to_string(),
                source,
            })?;

        // Run on its own task so a panicking agent call is contained.
        let ctx = ctx.clone();
        tokio::spawn(async move { handler.execute(args, &ctx).await })
            .await
            .map_err(|e| ToolError::Internal(format!("Tool `{}` aborted: {}", name, e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::ParamSpec;
    use crate::testing::MockConnector;
    use serde_json::json;

    struct EchoHandler;

    impl ToolHandler for EchoHandler {
        fn name(&self) -> &str {
            "echo"
        }

        fn title(&self) -> Option<&str> {
            Some("Echo")
        }

        fn description(&self) -> &str {
            "Echo the message back."
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new().param(ParamSpec::string("message", "Text to echo."))
        }

        fn execute(&self, args: ToolArgs, _ctx: &ToolContext) -> ToolFuture<'_> {
            let message = args.str("message").to_string();
            Box::pin(async move {
                if message == "panic" {
                    panic!("handler exploded");
                }
                Ok(message)
            })
        }
    }

    fn ctx() -> ToolContext {
        ToolContext {
            session: BrowserSession::new(MockConnector::new().into_arc()),
        }
    }

    fn text_of(result: &CallToolResult) -> &str {
        result.content[0].as_text().map(|t| t.text.as_str()).unwrap()
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = ToolRegistry::new()
            .register_handler(EchoHandler)
            .unwrap()
            .register_handler(EchoHandler)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Duplicate tool name: echo"));
    }

    #[test]
    fn test_list_tools_carries_schema_and_title() {
        let registry = ToolRegistry::new().register_handler(EchoHandler).unwrap();
        let tools = registry.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
        assert_eq!(tools[0].title.as_deref(), Some("Echo"));
        assert_eq!(tools[0].input_schema["required"], json!(["message"]));
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let registry = ToolRegistry::new().register_handler(EchoHandler).unwrap();
        let args = json!({ "message": "hi" }).as_object().cloned().unwrap();
        let result = registry.call_tool("echo", args, &ctx()).await;
        assert_ne!(result.is_error, Some(true));
        assert_eq!(result.content.len(), 1);
        assert_eq!(text_of(&result), "hi");
    }

    #[tokio::test]
    async fn test_schema_error_envelope() {
        let registry = ToolRegistry::new().register_handler(EchoHandler).unwrap();
        let result = registry.call_tool("echo", JsonObject::new(), &ctx()).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text_of(&result),
            "Invalid arguments for echo: missing required parameter `message`"
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_envelope() {
        let registry = ToolRegistry::new();
        let result = registry.call_tool("nope", JsonObject::new(), &ctx()).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text_of(&result), "Unknown tool: nope");
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let registry = ToolRegistry::new().register_handler(EchoHandler).unwrap();
        let args = json!({ "message": "panic" }).as_object().cloned().unwrap();
        let result = registry.call_tool("echo", args, &ctx()).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).starts_with("Tool `echo` aborted"));
    }
}
