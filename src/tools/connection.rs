//! Handlers that fill and clear the connection slot.

use crate::agent::ConnectOptions;
use crate::session::ConnectTarget;
use crate::tools::schema::{ParamSpec, ToolArgs, ToolSchema};
use crate::tools::{ToolContext, ToolFuture, ToolHandler};

fn force_same_tab_param() -> ParamSpec {
    ParamSpec::boolean(
        "forceSameTabNavigation",
        "If true (default), restricts pages from opening new tabs, forcing new pages to open in the current tab.",
    )
    .default_value(true)
}

fn connect_options(args: &ToolArgs) -> ConnectOptions {
    ConnectOptions {
        force_same_tab_navigation: args.flag("forceSameTabNavigation"),
    }
}

/// Handler for the `browser_connect_current_tab` tool.
pub struct ConnectCurrentTabHandler;

impl ToolHandler for ConnectCurrentTabHandler {
    fn name(&self) -> &str {
        "browser_connect_current_tab"
    }

    fn title(&self) -> Option<&str> {
        Some("Connect to Current Tab")
    }

    fn description(&self) -> &str {
        "Connects to the currently active tab in the user's browser."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().param(force_same_tab_param())
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            session
                .connect(ConnectTarget::CurrentTab, connect_options(&args))
                .await?;
            Ok("Connected to current tab.".to_string())
        })
    }
}

/// Handler for the `browser_connect_new_tab` tool.
pub struct ConnectNewTabHandler;

impl ToolHandler for ConnectNewTabHandler {
    fn name(&self) -> &str {
        "browser_connect_new_tab"
    }

    fn title(&self) -> Option<&str> {
        Some("Connect to New Tab")
    }

    fn description(&self) -> &str {
        "Opens a URL in a new browser tab and connects to it."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string("url", "The URL to open in the new tab."))
            .param(force_same_tab_param())
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let url = args.str("url").to_string();
            session
                .connect(ConnectTarget::NewTab { url: url.clone() }, connect_options(&args))
                .await?;
            Ok(format!("Connected to new tab: {}", url))
        })
    }
}

/// Handler for the `browser_disconnect` tool.
pub struct DisconnectHandler;

impl ToolHandler for DisconnectHandler {
    fn name(&self) -> &str {
        "browser_disconnect"
    }

    fn title(&self) -> Option<&str> {
        Some("Disconnect")
    }

    fn description(&self) -> &str {
        "Disconnects from the currently connected browser tab and releases resources."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().param(
            ParamSpec::boolean(
                "closeNewTabsAfterDisconnect",
                "If true, tabs opened while connected are closed when the connection is torn down.",
            )
            .default_value(false),
        )
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            session
                .disconnect(args.flag("closeNewTabsAfterDisconnect"))
                .await?;
            Ok("Disconnected.".to_string())
        })
    }
}
