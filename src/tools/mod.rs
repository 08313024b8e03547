//! Tool handler registry for the browser tools.
//!
//! Each tool is a `ToolHandler` with a declarative argument schema. The
//! registry validates arguments, dispatches to the handler and turns every
//! outcome into a `CallToolResult`.

mod registry;
pub mod schema;

pub use registry::{ToolContext, ToolFuture, ToolHandler, ToolRegistry};

// Tool handler implementations
mod connection;
mod extraction;
mod interaction;
mod script;


pub use connection::{ConnectCurrentTabHandler, ConnectNewTabHandler, DisconnectHandler};
pub use extraction::{AiAssertHandler, AiQueryHandler, AiWaitForHandler};
pub use interaction::{
    AiActionHandler, AiHoverHandler, AiInputHandler, AiKeyboardPressHandler, AiScrollHandler,
    AiTapHandler,
};
pub use script::{EvaluateJavascriptHandler, RunYamlHandler, SetActionContextHandler};

/// Build a registry holding every browser tool.
pub fn default_registry() -> anyhow::Result<ToolRegistry> {
    ToolRegistry::new()
        .register_handler(ConnectCurrentTabHandler)?
        .register_handler(ConnectNewTabHandler)?
        .register_handler(DisconnectHandler)?
        .register_handler(AiActionHandler)?
        .register_handler(AiTapHandler)?
        .register_handler(AiHoverHandler)?
        .register_handler(AiInputHandler)?
        .register_handler(AiKeyboardPressHandler)?
        .register_handler(AiScrollHandler)?
        .register_handler(AiQueryHandler)?
        .register_handler(AiAssertHandler)?
        .register_handler(AiWaitForHandler)?
        .register_handler(RunYamlHandler)?
        .register_handler(SetActionContextHandler)?
        .register_handler(EvaluateJavascriptHandler)
}
