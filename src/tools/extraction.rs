//! Handlers that read the page: data extraction, assertions and waits.

use std::time::Duration;

use crate::agent::AgentError;
use crate::tools::schema::{ParamSpec, ToolArgs, ToolSchema};
use crate::tools::{ToolContext, ToolFuture, ToolHandler};
use crate::utils::render_value;
use crate::wait_for::{
    DEFAULT_CHECK_INTERVAL_MS, DEFAULT_TIMEOUT_MS, WaitForOptions, wait_for_condition,
};

/// Handler for the `browser_ai_query` tool.
pub struct AiQueryHandler;

impl ToolHandler for AiQueryHandler {
    fn name(&self) -> &str {
        "browser_ai_query"
    }

    fn title(&self) -> Option<&str> {
        Some("Query Page Data")
    }

    fn description(&self) -> &str {
        "Extracts structured data from the UI using multimodal AI reasoning. Describe the desired data format within the prompt."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().param(ParamSpec::string(
            "dataShape",
            "A description of the expected return format and the data to extract. Examples: 'The date and time displayed in the top-left corner as a string', 'User information in the format {name: string}', 'string[], list of task names', '{name: string, age: number}[], table data records'.",
        ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let value = agent.ai_query(args.str("dataShape")).await?;
            Ok(render_value(&value))
        })
    }
}

/// Handler for the `browser_ai_assert` tool.
pub struct AiAssertHandler;

impl ToolHandler for AiAssertHandler {
    fn name(&self) -> &str {
        "browser_ai_assert"
    }

    fn title(&self) -> Option<&str> {
        Some("Assert Condition")
    }

    fn description(&self) -> &str {
        "Checks a natural language condition against the page. Fails with an AI-generated reason if the condition does not hold."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string(
                "assertion",
                "The assertion described in natural language (e.g., 'The login button is visible', 'The price of item X is $10').",
            ))
            .param(
                ParamSpec::string(
                    "errorMsg",
                    "An optional custom error message to append if the assertion fails.",
                )
                .optional(),
            )
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let assertion = args.str("assertion");

            agent
                .ai_assert(assertion)
                .await
                .map_err(|e| match args.opt_str("errorMsg") {
                    Some(msg) => AgentError::Runtime(format!("{}\n{}", e, msg)),
                    None => e,
                })?;
            Ok(format!("Assertion passed: \"{}\"", assertion))
        })
    }
}

/// Handler for the `browser_ai_wait_for` tool.
pub struct AiWaitForHandler;

impl AiWaitForHandler {
    fn options(args: &ToolArgs) -> WaitForOptions {
        let millis = |name: &str, default: u64| {
            args.opt_f64(name)
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(Duration::from_millis(default))
        };
        WaitForOptions {
            timeout: millis("timeoutMs", DEFAULT_TIMEOUT_MS),
            check_interval: millis("checkIntervalMs", DEFAULT_CHECK_INTERVAL_MS),
        }
    }
}

impl ToolHandler for AiWaitForHandler {
    fn name(&self) -> &str {
        "browser_ai_wait_for"
    }

    fn title(&self) -> Option<&str> {
        Some("Wait For Condition")
    }

    fn description(&self) -> &str {
        "Waits until a condition, described in natural language, becomes true on the page. Polls the condition using AI."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string(
                "assertion",
                "The condition to wait for, described in natural language.",
            ))
            .param(
                ParamSpec::number(
                    "timeoutMs",
                    "Maximum time to wait in milliseconds (default: 15000).",
                )
                .minimum(0.0)
                .default_value(DEFAULT_TIMEOUT_MS),
            )
            .param(
                ParamSpec::number(
                    "checkIntervalMs",
                    "Interval between checks in milliseconds (default: 3000).",
                )
                .minimum(0.0)
                .default_value(DEFAULT_CHECK_INTERVAL_MS),
            )
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let assertion = args.str("assertion");
            wait_for_condition(agent.as_ref(), assertion, Self::options(&args)).await?;
            Ok(format!("Wait condition met: \"{}\"", assertion))
        })
    }
}
