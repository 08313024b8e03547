//! Handlers that hand scripts and standing instructions to the agent.

use crate::tools::schema::{ParamSpec, ToolArgs, ToolSchema};
use crate::tools::{ToolContext, ToolFuture, ToolHandler};
use crate::utils::render_value;

/// Handler for the `browser_run_yaml` tool.
pub struct RunYamlHandler;

impl ToolHandler for RunYamlHandler {
    fn name(&self) -> &str {
        "browser_run_yaml"
    }

    fn title(&self) -> Option<&str> {
        Some("Run YAML Script")
    }

    fn description(&self) -> &str {
        "Executes an automation script written in YAML format. Only the 'tasks' part of the script is executed; results of any query steps are returned."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().param(ParamSpec::string(
            "yamlScriptContent",
            "The YAML-formatted script content containing the 'tasks' to execute.",
        ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let outcome = agent.run_yaml(args.str("yamlScriptContent")).await?;
            Ok(format!(
                "YAML script executed. Query results:\n{}",
                render_value(&outcome.result)
            ))
        })
    }
}

/// Handler for the `browser_set_ai_action_context` tool.
pub struct SetActionContextHandler;

impl ToolHandler for SetActionContextHandler {
    fn name(&self) -> &str {
        "browser_set_ai_action_context"
    }

    fn title(&self) -> Option<&str> {
        Some("Set Action Context")
    }

    fn description(&self) -> &str {
        "Sets background knowledge for the AI model used by 'browser_ai_action'. The context persists for subsequent action calls."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().param(ParamSpec::string(
            "actionContext",
            "The background knowledge or standing instructions for the AI (e.g., 'Always close cookie consent dialogs first if they appear.').",
        ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            agent
                .set_ai_action_context(args.str("actionContext"))
                .await?;
            Ok("AI action context updated.".to_string())
        })
    }
}

/// Handler for the `browser_evaluate_javascript` tool.
pub struct EvaluateJavascriptHandler;

impl ToolHandler for EvaluateJavascriptHandler {
    fn name(&self) -> &str {
        "browser_evaluate_javascript"
    }

    fn title(&self) -> Option<&str> {
        Some("Evaluate JavaScript")
    }

    fn description(&self) -> &str {
        "Evaluates a JavaScript expression within the context of the current web page."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().param(ParamSpec::string(
            "script",
            "The JavaScript expression to evaluate (e.g., 'document.title', 'window.location.href').",
        ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let value = agent.evaluate_javascript(args.str("script")).await?;
            Ok(render_value(&value))
        })
    }
}
