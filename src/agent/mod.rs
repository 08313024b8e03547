//! The seam to the external browser automation agent.
//!
//! Element location, AI planning and page control all live behind
//! [`BrowserAgent`]. This crate only calls into it and relays results.
//! [`AgentConnector`] produces connected agents; the session layer owns the
//! single live one.

pub mod mcp_bridge;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use mcp_bridge::{McpBridgeAgent, McpBridgeConnector};

/// Failures raised by the automation agent or its transport.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    /// The agent itself reported a failure: element not found, assertion
    /// failed, evaluation error and so on. The message is relayed verbatim.
    #[error("{0}")]
    Runtime(String),

    /// The agent could not be reached or its response was unusable.
    #[error("Agent transport error: {0}")]
    Transport(String),
}

/// Options for connecting to a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// Force pages that would open a new tab to open in the current one.
    pub force_same_tab_navigation: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            force_same_tab_navigation: true,
        }
    }
}

/// Options shared by single-element interactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateOptions {
    /// Two-pass element location for ambiguous targets.
    pub deep_think: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// Wire names, advertised as the tool schema enum.
    pub const VALUES: &'static [&'static str] = &["up", "down", "left", "right"];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrollType {
    #[default]
    Once,
    UntilBottom,
    UntilTop,
    UntilLeft,
    UntilRight,
}

impl ScrollType {
    pub const VALUES: &'static [&'static str] =
        &["once", "untilBottom", "untilTop", "untilLeft", "untilRight"];
}

/// Scroll request as understood by the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollParam {
    pub direction: ScrollDirection,
    pub scroll_type: ScrollType,
    /// Pixels, only meaningful for [`ScrollType::Once`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Output of a script run: the values produced by its data-extraction steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptOutcome {
    pub result: Value,
}

/// A connected automation agent bound to one browser tab.
///
/// Every method may fail; callers adapt failures into error envelopes.
#[async_trait]
pub trait BrowserAgent: Send + Sync {
    /// Tear down the connection. Optionally close tabs opened while connected.
    async fn destroy(&self, close_new_tabs: bool) -> Result<(), AgentError>;

    /// Plan and execute a multi-step action described in natural language.
    async fn ai_action(&self, prompt: &str) -> Result<(), AgentError>;

    async fn ai_tap(&self, locate: &str, options: LocateOptions) -> Result<(), AgentError>;

    async fn ai_hover(&self, locate: &str, options: LocateOptions) -> Result<(), AgentError>;

    /// Replace the content of the located element. Empty `text` clears it.
    async fn ai_input(
        &self,
        text: &str,
        locate: &str,
        options: LocateOptions,
    ) -> Result<(), AgentError>;

    async fn ai_keyboard_press(
        &self,
        key: &str,
        locate: Option<&str>,
        options: LocateOptions,
    ) -> Result<(), AgentError>;

    async fn ai_scroll(
        &self,
        param: &ScrollParam,
        locate: Option<&str>,
        options: LocateOptions,
    ) -> Result<(), AgentError>;

    /// Extract data shaped as described by `data_shape`.
    async fn ai_query(&self, data_shape: &str) -> Result<Value, AgentError>;

    /// Check a condition; fails with the AI-generated reason when false.
    async fn ai_assert(&self, assertion: &str) -> Result<(), AgentError>;

    /// Evaluate a condition without failing when it is false.
    async fn ai_boolean(&self, condition: &str) -> Result<bool, AgentError>;

    /// Execute the `tasks` section of a YAML automation script.
    async fn run_yaml(&self, script: &str) -> Result<ScriptOutcome, AgentError>;

    /// Background knowledge applied to subsequent [`BrowserAgent::ai_action`] calls.
    async fn set_ai_action_context(&self, context: &str) -> Result<(), AgentError>;

    async fn evaluate_javascript(&self, script: &str) -> Result<Value, AgentError>;

    /// True once the agent has torn itself down (e.g. its transport closed).
    fn is_closed(&self) -> bool {
        false
    }
}

/// Creates connected agents.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    /// Attach a new agent to the browser's active tab.
    async fn connect_current_tab(
        &self,
        options: ConnectOptions,
    ) -> Result<Arc<dyn BrowserAgent>, AgentError>;

    /// Open `url` in a new tab and attach a new agent to it.
    async fn connect_new_tab(
        &self,
        url: &str,
        options: ConnectOptions,
    ) -> Result<Arc<dyn BrowserAgent>, AgentError>;
}
